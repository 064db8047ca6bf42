//! Typed contract syntax tree consumed by the Horn encoder.
//!
//! This is deliberately decoupled from any particular front end: a parser
//! and type checker produce these nodes (or tests build them through
//! [`AstBuilder`]), and the encoder only ever reads them. Every node that
//! the encoder can name carries a pass-unique [`NodeId`].

use std::fmt;

use num_bigint::BigInt;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;

/// Identifier of an AST node, unique within one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte range inside a named source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub source: String,
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.source, self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    /// `uintN` / `intN`
    Integer { bits: u16, signed: bool },
    Address,
    Mapping(Box<Type>, Box<Type>),
    /// Dynamically-sized array of value types.
    Array(Box<Type>),
}

impl Type {
    pub fn uint(bits: u16) -> Self {
        Type::Integer { bits, signed: false }
    }

    pub fn int(bits: u16) -> Self {
        Type::Integer { bits, signed: true }
    }

    pub fn uint256() -> Self {
        Type::uint(256)
    }

    pub fn mapping(key: Type, value: Type) -> Self {
        Type::Mapping(Box::new(key), Box::new(value))
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// Integer-like types with a finite range.
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Integer { .. } | Type::Address)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Integer { signed: true, .. })
    }

    pub fn is_value_type(&self) -> bool {
        matches!(self, Type::Bool | Type::Integer { .. } | Type::Address)
    }

    pub fn is_reference_or_mapping(&self) -> bool {
        matches!(self, Type::Mapping(..) | Type::Array(_))
    }

    fn bit_width(&self) -> Option<u16> {
        match self {
            Type::Integer { bits, .. } => Some(*bits),
            Type::Address => Some(160),
            _ => None,
        }
    }

    /// Smallest representable value of an integer-like type.
    pub fn min_value(&self) -> Option<BigInt> {
        let bits = self.bit_width()?;
        if self.is_signed() {
            Some(-(BigInt::one() << (bits - 1)))
        } else {
            Some(BigInt::zero())
        }
    }

    /// Largest representable value of an integer-like type.
    pub fn max_value(&self) -> Option<BigInt> {
        let bits = self.bit_width()?;
        if self.is_signed() {
            Some((BigInt::one() << (bits - 1)) - 1)
        } else {
            Some((BigInt::one() << bits) - 1)
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Integer { bits, signed: true } => write!(f, "int{bits}"),
            Type::Integer { bits, signed: false } => write!(f, "uint{bits}"),
            Type::Address => write!(f, "address"),
            Type::Mapping(k, v) => write!(f, "mapping({k} => {v})"),
            Type::Array(e) => write!(f, "{e}[]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: NodeId,
    pub path: String,
    pub contracts: Vec<Contract>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Contract,
    Interface,
    Library,
}

#[derive(Debug, Clone)]
pub struct Contract {
    pub id: NodeId,
    pub name: String,
    pub kind: ContractKind,
    /// C3 linearization, most derived first; always starts with `id`.
    pub linearized_bases: Vec<NodeId>,
    pub state_variables: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
    pub location: SourceLocation,
}

impl Contract {
    pub fn is_library(&self) -> bool {
        self.kind == ContractKind::Library
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ContractKind::Interface
    }

    pub fn constructor(&self) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.is_constructor())
    }

    /// Append `base`'s linearization after this contract's own.
    pub fn inherit(mut self, base: &Contract) -> Self {
        for id in &base.linearized_bases {
            if !self.linearized_bases.contains(id) {
                self.linearized_bases.push(*id);
            }
        }
        self
    }

    pub fn with_kind(mut self, kind: ContractKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Constructor,
    Function,
    Fallback,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub mutability: StateMutability,
    pub parameters: Vec<VariableDeclaration>,
    pub returns: Vec<VariableDeclaration>,
    /// `None` for unimplemented (interface or abstract) functions.
    pub body: Option<Block>,
    pub location: SourceLocation,
}

impl FunctionDefinition {
    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    /// Callable as a transaction.
    pub fn is_public(&self) -> bool {
        matches!(self.visibility, Visibility::Public | Visibility::External)
    }

    pub fn is_implemented(&self) -> bool {
        self.body.is_some()
    }

    /// Pure and view functions never modify state.
    pub fn is_read_only(&self) -> bool {
        matches!(self.mutability, StateMutability::Pure | StateMutability::View)
    }

    /// Name used in traces and relation names.
    pub fn display_name(&self) -> &str {
        match self.kind {
            FunctionKind::Constructor => "constructor",
            FunctionKind::Fallback => "fallback",
            FunctionKind::Receive => "receive",
            FunctionKind::Function => &self.name,
        }
    }

    /// Name plus parameter types; equal signatures override.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(|p| p.ty.to_string()).collect();
        format!("{}({})", self.display_name(), params.join(","))
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_mutability(mut self, mutability: StateMutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    /// Initializer (state variables and local declarations).
    pub value: Option<Expression>,
    pub location: SourceLocation,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Block),
    VariableDeclaration(VariableDeclaration),
    Expression(Expression),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Break(Jump),
    Continue(Jump),
    Return(Return),
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Block(b) => b.id,
            Statement::VariableDeclaration(d) => d.id,
            Statement::Expression(e) => e.id,
            Statement::If(s) => s.id,
            Statement::While(s) => s.id,
            Statement::For(s) => s.id,
            Statement::Break(j) | Statement::Continue(j) => j.id,
            Statement::Return(r) => r.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub id: NodeId,
    pub condition: Expression,
    pub true_body: Box<Statement>,
    pub false_body: Option<Box<Statement>>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub id: NodeId,
    pub condition: Expression,
    pub body: Box<Statement>,
    pub is_do_while: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub id: NodeId,
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expression>,
    pub post: Option<Expression>,
    pub body: Box<Statement>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Jump {
    pub id: NodeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub id: NodeId,
    pub expression: Option<Expression>,
    pub location: SourceLocation,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Expression {
    pub id: NodeId,
    pub kind: ExpressionKind,
    /// Type of the expression's value (the common type for arithmetic).
    pub ty: Type,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Arithmetic(ArithmeticOp),
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Increment { prefix: bool },
    Decrement { prefix: bool },
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    BoolLiteral(bool),
    NumberLiteral(BigInt),
    /// Reference to a variable declaration.
    Identifier(NodeId),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
    },
    /// `lhs = rhs`, or `lhs op= rhs` when `op` is set.
    Assignment {
        op: Option<ArithmeticOp>,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    IndexAccess {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// `array.length`
    Length(Box<Expression>),
    FunctionCall(FunctionCall),
}

/// How a call site is dispatched, as resolved by the type checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Assert,
    Require,
    /// Call of a function whose body is visible (same contract hierarchy or
    /// a library).
    Internal(NodeId),
    /// Message call; the callee definition when it is known.
    External(Option<NodeId>),
    BareStaticCall,
    DelegateCall,
    BareCall,
    BareCallCode,
    BareDelegateCall,
    Creation,
    ArrayPush,
    ArrayPop,
    AddMod,
    MulMod,
    /// Any other builtin (`keccak256`, `ecrecover`, ...): an unconstrained
    /// value of the call's type.
    Builtin(String),
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub kind: CallKind,
    /// Receiver for member calls (`arr.push`, `other.f`).
    pub receiver: Option<Box<Expression>>,
    pub arguments: Vec<Expression>,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Id-based lookup over a set of source units.
pub struct AstIndex<'a> {
    contracts: FxHashMap<NodeId, &'a Contract>,
    functions: FxHashMap<NodeId, (&'a FunctionDefinition, NodeId)>,
    variables: FxHashMap<NodeId, &'a VariableDeclaration>,
    state_variable_owner: FxHashMap<NodeId, NodeId>,
    locals: FxHashMap<NodeId, Vec<&'a VariableDeclaration>>,
}

impl<'a> AstIndex<'a> {
    pub fn build(units: &'a [SourceUnit]) -> Self {
        let mut index = Self {
            contracts: FxHashMap::default(),
            functions: FxHashMap::default(),
            variables: FxHashMap::default(),
            state_variable_owner: FxHashMap::default(),
            locals: FxHashMap::default(),
        };
        for contract in units.iter().flat_map(|u| &u.contracts) {
            index.contracts.insert(contract.id, contract);
            for var in &contract.state_variables {
                index.variables.insert(var.id, var);
                index.state_variable_owner.insert(var.id, contract.id);
            }
            for function in &contract.functions {
                index.functions.insert(function.id, (function, contract.id));
                for var in function.parameters.iter().chain(&function.returns) {
                    index.variables.insert(var.id, var);
                }
                let mut locals = Vec::new();
                if let Some(body) = &function.body {
                    collect_locals_in_block(body, &mut locals);
                }
                for var in &locals {
                    index.variables.insert(var.id, var);
                }
                index.locals.insert(function.id, locals);
            }
        }
        index
    }

    pub fn contract(&self, id: NodeId) -> Option<&'a Contract> {
        self.contracts.get(&id).copied()
    }

    pub fn function(&self, id: NodeId) -> Option<&'a FunctionDefinition> {
        self.functions.get(&id).map(|(f, _)| *f)
    }

    /// Contract in which the function is defined.
    pub fn defining_contract(&self, function: NodeId) -> Option<&'a Contract> {
        let (_, owner) = self.functions.get(&function)?;
        self.contract(*owner)
    }

    pub fn variable(&self, id: NodeId) -> Option<&'a VariableDeclaration> {
        self.variables.get(&id).copied()
    }

    pub fn is_state_variable(&self, id: NodeId) -> bool {
        self.state_variable_owner.contains_key(&id)
    }

    /// Contracts of the linearized hierarchy, most derived first.
    pub fn bases(&self, contract: &Contract) -> Vec<&'a Contract> {
        contract
            .linearized_bases
            .iter()
            .filter_map(|id| self.contract(*id))
            .collect()
    }

    /// State variables of the hierarchy, most base first.
    pub fn state_variables(&self, contract: &Contract) -> Vec<&'a VariableDeclaration> {
        self.bases(contract)
            .into_iter()
            .rev()
            .flat_map(|c| c.state_variables.iter())
            .collect()
    }

    /// Local variables declared anywhere in the function body, in source
    /// order.
    pub fn local_variables(&self, function: NodeId) -> &[&'a VariableDeclaration] {
        self.locals.get(&function).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn collect_locals_in_block<'a>(block: &'a Block, out: &mut Vec<&'a VariableDeclaration>) {
    for statement in &block.statements {
        collect_locals(statement, out);
    }
}

fn collect_locals<'a>(statement: &'a Statement, out: &mut Vec<&'a VariableDeclaration>) {
    match statement {
        Statement::Block(block) => collect_locals_in_block(block, out),
        Statement::VariableDeclaration(decl) => out.push(decl),
        Statement::If(s) => {
            collect_locals(&s.true_body, out);
            if let Some(f) = &s.false_body {
                collect_locals(f, out);
            }
        }
        Statement::While(s) => collect_locals(&s.body, out),
        Statement::For(s) => {
            if let Some(init) = &s.init {
                collect_locals(init, out);
            }
            collect_locals(&s.body, out);
        }
        Statement::Expression(_)
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Return(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Programmatic construction of typed trees with fresh node ids.
///
/// Locations are synthesized from the node id so that every node points at
/// a distinct (empty) range of the builder's source.
#[derive(Debug, Clone)]
pub struct AstBuilder {
    next_id: u64,
    source: String,
}

impl AstBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            next_id: 1,
            source: source.into(),
        }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn location(&self, id: NodeId) -> SourceLocation {
        let offset = id.0 as usize;
        SourceLocation {
            source: self.source.clone(),
            start: offset,
            end: offset,
        }
    }

    // --- declarations ---

    pub fn unit(&mut self, contracts: Vec<Contract>) -> SourceUnit {
        let id = self.next_id();
        SourceUnit {
            id,
            path: self.source.clone(),
            contracts,
        }
    }

    pub fn contract(
        &mut self,
        name: &str,
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> Contract {
        let id = self.next_id();
        Contract {
            id,
            name: name.to_string(),
            kind: ContractKind::Contract,
            linearized_bases: vec![id],
            state_variables,
            functions,
            location: self.location(id),
        }
    }

    /// A public, non-payable function.
    pub fn function(
        &mut self,
        name: &str,
        parameters: Vec<VariableDeclaration>,
        returns: Vec<VariableDeclaration>,
        statements: Vec<Statement>,
    ) -> FunctionDefinition {
        let id = self.next_id();
        let body = self.block(statements);
        FunctionDefinition {
            id,
            name: name.to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::Public,
            mutability: StateMutability::NonPayable,
            parameters,
            returns,
            body: Some(body),
            location: self.location(id),
        }
    }

    pub fn constructor(
        &mut self,
        parameters: Vec<VariableDeclaration>,
        statements: Vec<Statement>,
    ) -> FunctionDefinition {
        let mut ctor = self.function("constructor", parameters, vec![], statements);
        ctor.kind = FunctionKind::Constructor;
        ctor
    }

    pub fn var(&mut self, name: &str, ty: Type) -> VariableDeclaration {
        let id = self.next_id();
        VariableDeclaration {
            id,
            name: name.to_string(),
            ty,
            value: None,
            location: self.location(id),
        }
    }

    pub fn var_init(&mut self, name: &str, ty: Type, value: Expression) -> VariableDeclaration {
        let mut decl = self.var(name, ty);
        decl.value = Some(value);
        decl
    }

    // --- statements ---

    pub fn block(&mut self, statements: Vec<Statement>) -> Block {
        let id = self.next_id();
        Block {
            id,
            statements,
            location: self.location(id),
        }
    }

    pub fn block_stmt(&mut self, statements: Vec<Statement>) -> Statement {
        Statement::Block(self.block(statements))
    }

    pub fn declare(&mut self, decl: VariableDeclaration) -> Statement {
        Statement::VariableDeclaration(decl)
    }

    pub fn expr_stmt(&mut self, expression: Expression) -> Statement {
        Statement::Expression(expression)
    }

    pub fn if_(&mut self, condition: Expression, then: Statement, otherwise: Option<Statement>) -> Statement {
        let id = self.next_id();
        Statement::If(IfStatement {
            id,
            condition,
            true_body: Box::new(then),
            false_body: otherwise.map(Box::new),
            location: self.location(id),
        })
    }

    pub fn while_(&mut self, condition: Expression, body: Statement) -> Statement {
        self.loop_(condition, body, false)
    }

    pub fn do_while(&mut self, condition: Expression, body: Statement) -> Statement {
        self.loop_(condition, body, true)
    }

    fn loop_(&mut self, condition: Expression, body: Statement, is_do_while: bool) -> Statement {
        let id = self.next_id();
        Statement::While(WhileStatement {
            id,
            condition,
            body: Box::new(body),
            is_do_while,
            location: self.location(id),
        })
    }

    pub fn for_(
        &mut self,
        init: Option<Statement>,
        condition: Option<Expression>,
        post: Option<Expression>,
        body: Statement,
    ) -> Statement {
        let id = self.next_id();
        Statement::For(ForStatement {
            id,
            init: init.map(Box::new),
            condition,
            post,
            body: Box::new(body),
            location: self.location(id),
        })
    }

    pub fn break_(&mut self) -> Statement {
        let id = self.next_id();
        Statement::Break(Jump {
            id,
            location: self.location(id),
        })
    }

    pub fn continue_(&mut self) -> Statement {
        let id = self.next_id();
        Statement::Continue(Jump {
            id,
            location: self.location(id),
        })
    }

    pub fn return_(&mut self, expression: Option<Expression>) -> Statement {
        let id = self.next_id();
        Statement::Return(Return {
            id,
            expression,
            location: self.location(id),
        })
    }

    pub fn assert_(&mut self, condition: Expression) -> Statement {
        let call = self.call(CallKind::Assert, None, vec![condition], Type::Bool);
        Statement::Expression(call)
    }

    pub fn require_(&mut self, condition: Expression) -> Statement {
        let call = self.call(CallKind::Require, None, vec![condition], Type::Bool);
        Statement::Expression(call)
    }

    // --- expressions ---

    pub fn expr(&mut self, kind: ExpressionKind, ty: Type) -> Expression {
        let id = self.next_id();
        Expression {
            id,
            kind,
            ty,
            location: self.location(id),
        }
    }

    pub fn ident(&mut self, decl: &VariableDeclaration) -> Expression {
        self.expr(ExpressionKind::Identifier(decl.id), decl.ty.clone())
    }

    pub fn number(&mut self, value: impl Into<BigInt>, ty: Type) -> Expression {
        self.expr(ExpressionKind::NumberLiteral(value.into()), ty)
    }

    pub fn bool_lit(&mut self, value: bool) -> Expression {
        self.expr(ExpressionKind::BoolLiteral(value), Type::Bool)
    }

    /// Arithmetic in the type of `lhs`.
    pub fn arith(&mut self, op: ArithmeticOp, lhs: Expression, rhs: Expression) -> Expression {
        let ty = lhs.ty.clone();
        self.expr(
            ExpressionKind::Binary {
                op: BinaryOp::Arithmetic(op),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    /// Comparison or logical connective (boolean result).
    pub fn compare(&mut self, op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
        self.expr(
            ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Type::Bool,
        )
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expression) -> Expression {
        let ty = if op == UnaryOp::Not { Type::Bool } else { operand.ty.clone() };
        self.expr(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn conditional(&mut self, condition: Expression, t: Expression, f: Expression) -> Expression {
        let ty = t.ty.clone();
        self.expr(
            ExpressionKind::Conditional {
                condition: Box::new(condition),
                true_expr: Box::new(t),
                false_expr: Box::new(f),
            },
            ty,
        )
    }

    pub fn assign(&mut self, lhs: Expression, rhs: Expression) -> Expression {
        self.assign_op(None, lhs, rhs)
    }

    pub fn assign_op(&mut self, op: Option<ArithmeticOp>, lhs: Expression, rhs: Expression) -> Expression {
        let ty = lhs.ty.clone();
        self.expr(
            ExpressionKind::Assignment {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    /// `base[index]`, typed by the mapping value or array element type.
    pub fn index(&mut self, base: Expression, index: Expression) -> Expression {
        let ty = match &base.ty {
            Type::Mapping(_, v) => (**v).clone(),
            Type::Array(e) => (**e).clone(),
            other => other.clone(),
        };
        self.expr(
            ExpressionKind::IndexAccess {
                base: Box::new(base),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn length(&mut self, array: Expression) -> Expression {
        self.expr(ExpressionKind::Length(Box::new(array)), Type::uint256())
    }

    pub fn call(
        &mut self,
        kind: CallKind,
        receiver: Option<Expression>,
        arguments: Vec<Expression>,
        ty: Type,
    ) -> Expression {
        self.expr(
            ExpressionKind::FunctionCall(FunctionCall {
                kind,
                receiver: receiver.map(Box::new),
                arguments,
            }),
            ty,
        )
    }

    /// Internal call of `callee`, typed by its first return value.
    pub fn call_internal(&mut self, callee: &FunctionDefinition, arguments: Vec<Expression>) -> Expression {
        let ty = callee.returns.first().map(|r| r.ty.clone()).unwrap_or(Type::Bool);
        self.call(CallKind::Internal(callee.id), None, arguments, ty)
    }
}
