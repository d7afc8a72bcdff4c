//! The AST contract: the shape of the input this crate consumes.
//!
//! Lexing, parsing, and semantic/type inference all happen upstream and are
//! out of scope (spec.md §1). This module is not a parser's output type —
//! it is the minimal read-only surface `ir_gen` needs, mirroring the
//! fields the original's `ast.h`/`ast_type.h`/`ast_expr.h`/`ast_stmt.h`
//! expose to `IRGEN/*`.

use latticec_session::SourceSpan;
use latticec_symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstFuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstCompositeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstEnumId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstGlobalId(pub u32);

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AstFuncTraits: u16 {
        const FOREIGN = 1 << 0;
        const VARARG = 1 << 1;
        const MAIN = 1 << 2;
        const STDCALL = 1 << 3;
        const POLYMORPHIC = 1 << 4;
        /// Method of a struct/polymorphic-struct, recorded separately from
        /// plain functions in `Ast::methods`/`Ast::poly_methods`.
        const METHOD = 1 << 5;
    }
}

/// One written `*`/`[N]` peel layer of an [`AstType`], outermost-first as
/// written in source (spec.md §4.2 "peels leading `*`/fixed-array layers").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstTypeLayer {
    Ptr,
    FixedArray(u64),
    /// `[$#N]` written in a polymorphic template before `N` is bound to a
    /// concrete length; resolved to `FixedArray` by
    /// `resolve_type_polymorphics` (spec.md §4.8).
    PolyCountArray(Symbol),
}

/// An AST-level type reference. `layers` holds peelable `*`/`[N]` prefixes;
/// `elem` is the terminal element they wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstType {
    pub layers: Vec<AstTypeLayer>,
    pub elem: AstTypeElem,
}

impl AstType {
    pub fn base(name: Symbol) -> Self {
        AstType { layers: Vec::new(), elem: AstTypeElem::Base(name) }
    }

    pub fn pointer_to(mut self) -> Self {
        self.layers.insert(0, AstTypeLayer::Ptr);
        self
    }

    /// A view of this type with its outermost layer peeled, or the bare
    /// terminal element's own one-layer-stripped type if `layers` is
    /// empty and `elem` is itself wrapping (used by RTTI subtype lookup,
    /// mirroring `ast_type_unwrapped_view`).
    pub fn unwrapped_view(&self) -> AstType {
        if !self.layers.is_empty() {
            return AstType { layers: self.layers[1..].to_vec(), elem: self.elem.clone() };
        }
        self.clone()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.layers.first(), Some(AstTypeLayer::Ptr))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstTypeElem {
    Base(Symbol),
    /// `<Ts…> Name` — a reference to a polymorphic composite template.
    GenericBase { name: Symbol, args: Vec<AstType> },
    Func { args: Vec<AstType>, return_type: Box<AstType>, traits: AstFuncTraits },
    /// An anonymous inline `struct(...)`/`union(...)` layout, lowered
    /// directly without a `TypeMap` entry of its own.
    Anonymous(Bone),
    /// `$T` / `$#N` polymorph placeholders, substituted during
    /// `resolve_type_polymorphics` (spec.md §4.8).
    PolyType(Symbol),
    PolyCount(Symbol),
}

/// A layout tree node (spec.md §4.2 "Layout bones").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bone {
    Type(AstType),
    Struct { children: Vec<(Symbol, Bone)>, packed: bool },
    Union { children: Vec<(Symbol, Bone)>, packed: bool },
}

#[derive(Debug, Clone)]
pub struct AstComposite {
    pub name: Symbol,
    pub layout: Bone,
    pub is_alias: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AstPolymorphicComposite {
    pub name: Symbol,
    pub type_params: Vec<Symbol>,
    pub count_params: Vec<Symbol>,
    pub layout: Bone,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AstEnum {
    pub name: Symbol,
    pub members: Vec<Symbol>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AstGlobal {
    pub name: Symbol,
    pub ty: AstType,
    pub initial: Option<AstExpr>,
    pub is_external: bool,
    pub is_thread_local: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AstArg {
    pub name: Symbol,
    pub ty: AstType,
    pub default: Option<AstExpr>,
}

#[derive(Debug, Clone)]
pub struct AstFunc {
    pub name: Symbol,
    pub args: Vec<AstArg>,
    pub return_type: AstType,
    pub traits: AstFuncTraits,
    pub type_params: Vec<Symbol>,
    pub statements: Vec<AstStmt>,
    pub export_as: Option<Symbol>,
    /// Set for struct/polymorphic-struct methods; `None` for free functions.
    pub method_of: Option<Symbol>,
    pub span: SourceSpan,
}

impl AstFunc {
    pub fn is_polymorphic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    #[default]
    Immutable,
    Mutable,
}

#[derive(Debug, Clone)]
pub enum AstExpr {
    Byte(i8),
    Ubyte(u8),
    Short(i16),
    Ushort(u16),
    Int(i32),
    Uint(u32),
    Long(i64),
    Ulong(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Null,
    CStr(String),
    Str(String),
    Variable(Symbol),
    /// `a op b`, covering every binary arithmetic/comparison/bitwise
    /// operator; `op` names the overload method tried on failure
    /// (`__add__`, `__subtract__`, …).
    BinOp { op: BinOp, lhs: Box<AstExpr>, rhs: Box<AstExpr> },
    And(Box<AstExpr>, Box<AstExpr>),
    Or(Box<AstExpr>, Box<AstExpr>),
    Not(Box<AstExpr>),
    Member { subject: Box<AstExpr>, field: Symbol, span: SourceSpan },
    ArrayAccess { subject: Box<AstExpr>, index: Box<AstExpr>, span: SourceSpan },
    At { subject: Box<AstExpr>, index: Box<AstExpr>, span: SourceSpan },
    Call { name: Symbol, args: Vec<AstExpr>, tentative: bool, span: SourceSpan },
    MethodCall { subject: Box<AstExpr>, name: Symbol, args: Vec<AstExpr>, tentative: bool, allow_drop: bool, span: SourceSpan },
    Cast { ty: AstType, value: Box<AstExpr> },
    New { ty: AstType, amount: Option<Box<AstExpr>>, undef: bool, inputs: Vec<AstExpr> },
    NewCString(String),
    Ternary { cond: Box<AstExpr>, then_expr: Box<AstExpr>, else_expr: Box<AstExpr> },
    Sizeof(AstType),
    SizeofValue(Box<AstExpr>),
    Alignof(AstType),
    PreIncrement(Box<AstExpr>),
    PreDecrement(Box<AstExpr>),
    PostIncrement(Box<AstExpr>),
    PostDecrement(Box<AstExpr>),
    Toggle(Box<AstExpr>),
    InlineDeclare { name: Symbol, ty: AstType, initial: Option<Box<AstExpr>>, undef: bool },
    Typeinfo(AstType),
    Typenameof(AstType),
    Embed(String),
    VaArg { va_list: Box<AstExpr>, ty: AstType },
    FuncAddr(Symbol),
    InitializerList { ty: AstType, values: Vec<AstExpr> },
    StaticArray { elem_ty: AstType, values: Vec<AstExpr> },
    StaticStruct { ty: AstType, values: Vec<AstExpr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NEq,
    Gt,
    Lt,
    Ge,
    Le,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    /// The overload method name tried when primitive lowering fails
    /// (spec.md §4.5 "try overload method").
    pub fn overload_method(self) -> &'static str {
        match self {
            BinOp::Add => "__add__",
            BinOp::Sub => "__subtract__",
            BinOp::Mul => "__multiply__",
            BinOp::Div => "__divide__",
            BinOp::Mod => "__modulus__",
            BinOp::Eq => "__equals__",
            BinOp::NEq => "__not_equals__",
            BinOp::Gt => "__greater_than__",
            BinOp::Lt => "__less_than__",
            BinOp::Ge => "__greater_than_or_equal__",
            BinOp::Le => "__less_than_or_equal__",
            BinOp::BitAnd => "__bit_and__",
            BinOp::BitOr => "__bit_or__",
            BinOp::BitXor => "__bit_xor__",
            BinOp::Shl => "__left_shift__",
            BinOp::Shr => "__right_shift__",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AstStmt {
    Return(Option<AstExpr>, SourceSpan),
    Declare { name: Symbol, ty: AstType, initial: Option<AstExpr>, undef: bool, pod: bool, inputs: Vec<AstExpr>, span: SourceSpan },
    Assign { dest: AstExpr, value: AstExpr, pod: bool, span: SourceSpan },
    CompoundAssign { dest: AstExpr, op: BinOp, value: AstExpr, span: SourceSpan },
    If { cond: AstExpr, body: Vec<AstStmt> },
    Unless { cond: AstExpr, body: Vec<AstStmt> },
    IfElse { cond: AstExpr, then_body: Vec<AstStmt>, else_body: Vec<AstStmt> },
    UnlessElse { cond: AstExpr, then_body: Vec<AstStmt>, else_body: Vec<AstStmt> },
    While { label: Option<Symbol>, cond: AstExpr, body: Vec<AstStmt> },
    Until { label: Option<Symbol>, cond: AstExpr, body: Vec<AstStmt> },
    WhileContinue { label: Option<Symbol>, cond: AstExpr, body: Vec<AstStmt> },
    UntilBreak { label: Option<Symbol>, cond: AstExpr, body: Vec<AstStmt> },
    EachIn { label: Option<Symbol>, it_name: Symbol, subject: AstExpr, is_static: bool, body: Vec<AstStmt>, span: SourceSpan },
    Repeat { label: Option<Symbol>, limit: AstExpr, body: Vec<AstStmt> },
    For { label: Option<Symbol>, before: Vec<AstStmt>, cond: AstExpr, after: Vec<AstStmt>, body: Vec<AstStmt> },
    Switch { scrutinee: AstExpr, cases: Vec<(AstExpr, Vec<AstStmt>)>, default: Option<Vec<AstStmt>>, exhaustive: bool, span: SourceSpan },
    Break(Option<Symbol>),
    Continue(Option<Symbol>),
    Fallthrough,
    Delete(AstExpr, SourceSpan),
    VaStart(AstExpr),
    VaEnd(AstExpr),
    VaCopy { dest: AstExpr, src: AstExpr },
    Asm { template: String, constraints: String, side_effects: bool, align_stack: bool, intel_dialect: bool },
    ConditionlessBlock(Vec<AstStmt>),
    Expr(AstExpr),
}

#[derive(Debug, Clone, Default)]
pub struct AstCommon {
    pub ast_variadic_array: Option<Symbol>,
    pub ast_usize_type: Option<AstType>,
    pub ast_int_type: Option<AstType>,
    pub ast_main_id: Option<AstFuncId>,
}

#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub funcs: Vec<AstFunc>,
    pub globals: Vec<AstGlobal>,
    pub composites: Vec<AstComposite>,
    pub polymorphic_composites: Vec<AstPolymorphicComposite>,
    pub enums: Vec<AstEnum>,
    pub common: AstCommon,
}

impl Ast {
    pub fn func(&self, id: AstFuncId) -> &AstFunc {
        &self.funcs[id.0 as usize]
    }

    pub fn push_func(&mut self, func: AstFunc) -> AstFuncId {
        let id = AstFuncId(self.funcs.len() as u32);
        self.funcs.push(func);
        id
    }
}

/// The top-level input to `ir_gen` (spec.md §6).
#[derive(Debug, Clone)]
pub struct Object {
    pub ast: Ast,
    pub filename: Symbol,
}
