//! An in-memory model of the LLVM IR subset the generator emits, plus its
//! textual form.
//!
//! Pointers are printed opaque (`ptr`), but the model keeps their pointee
//! types around: `load` and `getelementptr` need them, and list shapes are
//! told apart by them.

use std::{
    collections::HashMap,
    fmt::{self, Write as _},
    format_args as f,
    rc::Rc,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    I1,
    I8,
    I32,
    I64,
    Ptr(Box<Ty>),
    Array(u64, Box<Ty>),
    /// A named struct, either opaque or defined in [`Module::type_defs`].
    Named(Rc<str>),
}

impl Ty {
    pub fn ptr(pointee: Ty) -> Ty {
        Ty::Ptr(Box::new(pointee))
    }

    pub fn named(name: &str) -> Ty {
        Ty::Named(name.into())
    }

    pub fn pointee(&self) -> Option<&Ty> {
        match self {
            Ty::Ptr(pointee) => Some(pointee),
            _ => None,
        }
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Ty::Ptr(_))
    }

    /// Whether values of both types look the same at runtime. All pointers
    /// do, whatever they point to.
    pub fn same_repr(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Ptr(_), Ty::Ptr(_)) => true,
            _ => self == other,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => f.write_str("void"),
            Ty::I1 => f.write_str("i1"),
            Ty::I8 => f.write_str("i8"),
            Ty::I32 => f.write_str("i32"),
            Ty::I64 => f.write_str("i64"),
            Ty::Ptr(_) => f.write_str("ptr"),
            Ty::Array(len, elem) => write!(f, "[{len} x {elem}]"),
            Ty::Named(name) => write!(f, "%{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Local(Rc<str>),
    Global(Rc<str>),
    Int(i64),
    Null,
    Zero,
}

/// A typed operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    pub ty: Ty,
    pub operand: Operand,
}

impl Value {
    pub fn i32(v: i32) -> Value {
        Value {
            ty: Ty::I32,
            operand: Operand::Int(v.into()),
        }
    }

    pub fn i64(v: i64) -> Value {
        Value {
            ty: Ty::I64,
            operand: Operand::Int(v),
        }
    }

    pub fn bool(v: bool) -> Value {
        Value {
            ty: Ty::I1,
            operand: Operand::Int(v.into()),
        }
    }

    pub fn null(ty: Ty) -> Value {
        Value {
            ty,
            operand: Operand::Null,
        }
    }

    pub fn global(name: Rc<str>, ty: Ty) -> Value {
        Value {
            ty,
            operand: Operand::Global(name),
        }
    }

    /// The same operand, seen through another type of the same
    /// representation.
    pub fn retyped(self, ty: Ty) -> Value {
        debug_assert!(self.ty.same_repr(&ty));
        Value { ty, ..self }
    }

    /// Prints the operand alone, without its type.
    pub fn bare(&self) -> Bare<'_> {
        Bare(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.bare())
    }
}

pub struct Bare<'a>(&'a Value);

impl fmt::Display for Bare<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.0.operand, &self.0.ty) {
            (Operand::Int(0), Ty::I1) => f.write_str("false"),
            (Operand::Int(_), Ty::I1) => f.write_str("true"),
            (Operand::Int(v), _) => write!(f, "{v}"),
            (Operand::Local(name), _) => write!(f, "%{name}"),
            (Operand::Global(name), _) => write!(f, "@{name}"),
            (Operand::Null, _) => f.write_str("null"),
            (Operand::Zero, _) => f.write_str("zeroinitializer"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    And,
    Or,
    Xor,
}

impl BinOp {
    fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl IntPredicate {
    fn mnemonic(self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CastOp {
    Zext,
    Sext,
    Trunc,
    PtrToInt,
}

impl CastOp {
    fn mnemonic(self) -> &'static str {
        match self {
            CastOp::Zext => "zext",
            CastOp::Sext => "sext",
            CastOp::Trunc => "trunc",
            CastOp::PtrToInt => "ptrtoint",
        }
    }
}

/// A function which can be called: an extern, a runtime helper or a user
/// function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callee {
    pub name: Rc<str>,
    pub ret: Ty,
    pub params: Vec<Ty>,
    pub variadic: bool,
}

impl Callee {
    pub fn new(name: &str, ret: Ty, params: Vec<Ty>) -> Callee {
        Callee {
            name: name.into(),
            ret,
            params,
            variadic: false,
        }
    }

    pub fn variadic(name: &str, ret: Ty, params: Vec<Ty>) -> Callee {
        Callee {
            variadic: true,
            ..Callee::new(name, ret, params)
        }
    }

    fn write_params(&self, w: &mut impl fmt::Write) -> fmt::Result {
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            write!(w, "{param}")?;
        }
        if self.variadic {
            w.write_str(", ...")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    Alloca {
        dst: Rc<str>,
        ty: Ty,
    },
    Load {
        dst: Rc<str>,
        ty: Ty,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Binary {
        dst: Rc<str>,
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dst: Rc<str>,
        pred: IntPredicate,
        lhs: Value,
        rhs: Value,
    },
    Select {
        dst: Rc<str>,
        cond: Value,
        then: Value,
        otherwise: Value,
    },
    Call {
        dst: Option<Rc<str>>,
        callee: Callee,
        args: Vec<Value>,
    },
    Gep {
        dst: Rc<str>,
        base: Ty,
        ptr: Value,
        indices: Vec<Value>,
    },
    Cast {
        dst: Rc<str>,
        op: CastOp,
        value: Value,
        to: Ty,
    },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Alloca { dst, ty } => write!(f, "%{dst} = alloca {ty}"),
            Instr::Load { dst, ty, ptr } => write!(f, "%{dst} = load {ty}, {ptr}"),
            Instr::Store { value, ptr } => write!(f, "store {value}, {ptr}"),
            Instr::Binary { dst, op, lhs, rhs } => {
                let op = op.mnemonic();
                write!(f, "%{dst} = {op} {lhs}, {}", rhs.bare())
            }
            Instr::Icmp {
                dst,
                pred,
                lhs,
                rhs,
            } => {
                let pred = pred.mnemonic();
                write!(f, "%{dst} = icmp {pred} {lhs}, {}", rhs.bare())
            }
            Instr::Select {
                dst,
                cond,
                then,
                otherwise,
            } => write!(f, "%{dst} = select {cond}, {then}, {otherwise}"),
            Instr::Call { dst, callee, args } => {
                if let Some(dst) = dst {
                    write!(f, "%{dst} = ")?;
                }
                write!(f, "call {} ", callee.ret)?;
                if callee.variadic {
                    f.write_str("(")?;
                    callee.write_params(f)?;
                    f.write_str(") ")?;
                }
                write!(f, "@{}(", callee.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Instr::Gep {
                dst,
                base,
                ptr,
                indices,
            } => {
                write!(f, "%{dst} = getelementptr {base}, {ptr}")?;
                for index in indices {
                    write!(f, ", {index}")?;
                }
                Ok(())
            }
            Instr::Cast { dst, op, value, to } => {
                write!(f, "%{dst} = {} {value} to {to}", op.mnemonic())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    Ret(Option<Value>),
    Br(Rc<str>),
    CondBr {
        cond: Value,
        then: Rc<str>,
        otherwise: Rc<str>,
    },
    Unreachable,
}

impl Terminator {
    /// Labels this terminator may jump to.
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Terminator::Br(label) => vec![label],
            Terminator::CondBr {
                then, otherwise, ..
            } => vec![then, otherwise],
            Terminator::Ret(_) | Terminator::Unreachable => Vec::new(),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret(None) => f.write_str("ret void"),
            Terminator::Ret(Some(value)) => write!(f, "ret {value}"),
            Terminator::Br(label) => write!(f, "br label %{label}"),
            Terminator::CondBr {
                cond,
                then,
                otherwise,
            } => write!(f, "br {cond}, label %{then}, label %{otherwise}"),
            Terminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub label: Rc<str>,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: Rc<str>,
    pub ret: Ty,
    pub params: Vec<(Rc<str>, Ty)>,
    /// Stack slots, printed at the top of the first block.
    pub allocas: Vec<Instr>,
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn callee(&self) -> Callee {
        Callee {
            name: self.name.clone(),
            ret: self.ret.clone(),
            params: self.params.iter().map(|(_, ty)| ty.clone()).collect(),
            variadic: false,
        }
    }
}

/// Initial value of a module-level global.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Init {
    Value(Value),
    /// A NUL-terminated byte string.
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    pub name: Rc<str>,
    pub constant: bool,
    pub init: Init,
}

impl Global {
    pub fn ty(&self) -> Ty {
        match &self.init {
            Init::Value(value) => value.ty.clone(),
            Init::Bytes(bytes) => Ty::Array(bytes.len() as u64 + 1, Box::new(Ty::I8)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub name: Rc<str>,
    /// `None` for opaque structs.
    pub fields: Option<Vec<Ty>>,
}

#[derive(Debug, Default)]
pub struct Module {
    pub type_defs: Vec<TypeDef>,
    pub globals: Vec<Global>,
    pub declarations: Vec<Callee>,
    pub functions: Vec<Function>,
    strings: HashMap<Vec<u8>, Rc<str>>,
}

impl Module {
    pub fn new() -> Module {
        Module::default()
    }

    pub fn add_type(&mut self, name: &str, fields: Option<Vec<Ty>>) {
        self.type_defs.push(TypeDef {
            name: name.into(),
            fields,
        });
    }

    pub fn add_global(&mut self, name: Rc<str>, init: Init) -> Value {
        let global = Global {
            name,
            constant: false,
            init,
        };
        let value = Value::global(global.name.clone(), Ty::ptr(global.ty()));
        self.globals.push(global);
        value
    }

    /// Returns a pointer to a constant holding `s`, reusing an existing one
    /// with the same contents.
    pub fn add_string(&mut self, s: &str) -> Value {
        let ty = Ty::ptr(Ty::I8);
        if let Some(name) = self.strings.get(s.as_bytes()) {
            return Value::global(name.clone(), ty);
        }
        let name: Rc<str> = format!(".str.{}", self.strings.len()).into();
        self.strings.insert(s.as_bytes().to_vec(), name.clone());
        self.globals.push(Global {
            name: name.clone(),
            constant: true,
            init: Init::Bytes(s.as_bytes().to_vec()),
        });
        Value::global(name, ty)
    }

    pub fn declare(&mut self, callee: &Callee) {
        self.declarations.push(callee.clone());
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|func| &*func.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut w = Writer { f, indent: false };

        for def in &self.type_defs {
            match &def.fields {
                None => w.out(f!("%{} = type opaque", def.name))?,
                Some(fields) => {
                    let fields = fields
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    w.out(f!("%{} = type {{ {fields} }}", def.name))?;
                }
            }
        }
        w.blank()?;

        for global in &self.globals {
            let kind = if global.constant {
                "private unnamed_addr constant"
            } else {
                "global"
            };
            match &global.init {
                Init::Value(value) => w.out(f!("@{} = {kind} {value}", global.name))?,
                Init::Bytes(bytes) => {
                    let ty = global.ty();
                    let escaped = escape(bytes);
                    w.out(f!("@{} = {kind} {ty} c\"{escaped}\\00\"", global.name))?;
                }
            }
        }
        w.blank()?;

        for decl in &self.declarations {
            let mut params = String::new();
            decl.write_params(&mut params)?;
            w.out(f!("declare {} @{}({params})", decl.ret, decl.name))?;
        }

        for func in &self.functions {
            w.blank()?;
            w.function(func)?;
        }
        Ok(())
    }
}

struct Writer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    indent: bool,
}

impl Writer<'_, '_> {
    fn function(&mut self, func: &Function) -> fmt::Result {
        let params = func
            .params
            .iter()
            .map(|(name, ty)| format!("{ty} %{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.out(f!("define {} @{}({params}) {{", func.ret, func.name))?;
        for (i, block) in func.blocks.iter().enumerate() {
            if i > 0 {
                self.blank()?;
            }
            self.out(f!("{}:", block.label))?;
            self.indented(|this| {
                if i == 0 {
                    for alloca in &func.allocas {
                        this.out(f!("{alloca}"))?;
                    }
                }
                for instr in &block.instrs {
                    this.out(f!("{instr}"))?;
                }
                if let Some(terminator) = &block.terminator {
                    this.out(f!("{terminator}"))?;
                }
                Ok(())
            })?;
        }
        self.out("}")
    }

    fn indented(&mut self, f: impl FnOnce(&mut Self) -> fmt::Result) -> fmt::Result {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        res
    }

    fn out(&mut self, line: impl fmt::Display) -> fmt::Result {
        if self.indent {
            self.f.write_str("  ")?;
        }
        writeln!(self.f, "{line}")
    }

    fn blank(&mut self) -> fmt::Result {
        self.f.write_char('\n')
    }
}

fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if matches!(byte, b' '..=b'~') && byte != b'"' && byte != b'\\' {
            out.push(char::from(byte));
        } else {
            // Infallible, writes to a String.
            let _ = write!(out, "\\{byte:02X}");
        }
    }
    out
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockId(usize);

/// Appends instructions to the blocks of a single function.
///
/// Instructions pushed after the current block got its terminator land in a
/// fresh unreachable `dead.N` block, so every block keeps exactly one
/// terminator.
pub struct FunctionBuilder {
    function: Function,
    current: usize,
    next_temp: u32,
    next_label: u32,
    slot_names: HashMap<String, u32>,
}

impl FunctionBuilder {
    pub fn new(name: Rc<str>, ret: Ty, params: Vec<(Rc<str>, Ty)>) -> FunctionBuilder {
        let entry = Block {
            label: "entry".into(),
            instrs: Vec::new(),
            terminator: None,
        };
        FunctionBuilder {
            function: Function {
                name,
                ret,
                params,
                allocas: Vec::new(),
                blocks: vec![entry],
            },
            current: 0,
            next_temp: 0,
            next_label: 0,
            slot_names: HashMap::new(),
        }
    }

    pub fn ret_ty(&self) -> &Ty {
        &self.function.ret
    }

    pub fn param(&self, i: usize) -> Value {
        let (name, ty) = &self.function.params[i];
        Value {
            ty: ty.clone(),
            operand: Operand::Local(name.clone()),
        }
    }

    /// A number shared by the labels of one construct, e.g. `then.3` and
    /// `exit.3`.
    pub fn label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub fn append_block(&mut self, label: String) -> BlockId {
        self.function.blocks.push(Block {
            label: label.into(),
            instrs: Vec::new(),
            terminator: None,
        });
        BlockId(self.function.blocks.len() - 1)
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = block.0;
    }

    pub fn is_terminated(&self) -> bool {
        self.function.blocks[self.current].terminator.is_some()
    }

    fn temp(&mut self) -> Rc<str> {
        let name = format!("t{}", self.next_temp);
        self.next_temp += 1;
        name.into()
    }

    fn open_dead_block(&mut self) {
        let id = self.label_id();
        let block = self.append_block(format!("dead.{id}"));
        self.position_at_end(block);
    }

    fn push(&mut self, instr: Instr) {
        if self.is_terminated() {
            self.open_dead_block();
        }
        self.function.blocks[self.current].instrs.push(instr);
    }

    fn terminate(&mut self, terminator: Terminator) {
        if self.is_terminated() {
            self.open_dead_block();
        }
        self.function.blocks[self.current].terminator = Some(terminator);
    }

    fn label(&self, block: BlockId) -> Rc<str> {
        self.function.blocks[block.0].label.clone()
    }

    /// Allocates a stack slot in the entry block.
    pub fn alloca(&mut self, hint: &str, ty: Ty) -> Value {
        let count = self.slot_names.entry(hint.to_owned()).or_insert(0);
        let dst: Rc<str> = if *count == 0 {
            hint.into()
        } else {
            format!("{hint}.{count}").into()
        };
        *count += 1;
        self.function.allocas.push(Instr::Alloca {
            dst: dst.clone(),
            ty: ty.clone(),
        });
        Value {
            ty: Ty::ptr(ty),
            operand: Operand::Local(dst),
        }
    }

    pub fn load(&mut self, ptr: &Value) -> Value {
        // SAFETY: Callers only load through values built as pointers.
        let ty = ptr.ty.pointee().unwrap().clone();
        let dst = self.temp();
        self.push(Instr::Load {
            dst: dst.clone(),
            ty: ty.clone(),
            ptr: ptr.clone(),
        });
        Value {
            ty,
            operand: Operand::Local(dst),
        }
    }

    pub fn store(&mut self, value: Value, ptr: &Value) {
        self.push(Instr::Store {
            value,
            ptr: ptr.clone(),
        });
    }

    pub fn binary(&mut self, op: BinOp, lhs: &Value, rhs: &Value) -> Value {
        let dst = self.temp();
        let ty = lhs.ty.clone();
        self.push(Instr::Binary {
            dst: dst.clone(),
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        });
        Value {
            ty,
            operand: Operand::Local(dst),
        }
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: &Value, rhs: &Value) -> Value {
        let dst = self.temp();
        self.push(Instr::Icmp {
            dst: dst.clone(),
            pred,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        });
        Value {
            ty: Ty::I1,
            operand: Operand::Local(dst),
        }
    }

    pub fn select(&mut self, cond: &Value, then: Value, otherwise: Value) -> Value {
        let dst = self.temp();
        let ty = then.ty.clone();
        self.push(Instr::Select {
            dst: dst.clone(),
            cond: cond.clone(),
            then,
            otherwise,
        });
        Value {
            ty,
            operand: Operand::Local(dst),
        }
    }

    /// Calls `callee`. Returns `None` for `void` functions.
    pub fn call(&mut self, callee: &Callee, args: Vec<Value>) -> Option<Value> {
        let dst = (callee.ret != Ty::Void).then(|| self.temp());
        self.push(Instr::Call {
            dst: dst.clone(),
            callee: callee.clone(),
            args,
        });
        dst.map(|dst| Value {
            ty: callee.ret.clone(),
            operand: Operand::Local(dst),
        })
    }

    /// Calls a function known to return a value.
    pub fn call_value(&mut self, callee: &Callee, args: Vec<Value>) -> Value {
        let dst = self.temp();
        self.push(Instr::Call {
            dst: Some(dst.clone()),
            callee: callee.clone(),
            args,
        });
        Value {
            ty: callee.ret.clone(),
            operand: Operand::Local(dst),
        }
    }

    /// Computes an address from `ptr`, which points to `base`. The result
    /// points to `result`.
    pub fn gep(&mut self, base: &Ty, ptr: &Value, indices: Vec<Value>, result: Ty) -> Value {
        let dst = self.temp();
        self.push(Instr::Gep {
            dst: dst.clone(),
            base: base.clone(),
            ptr: ptr.clone(),
            indices,
        });
        Value {
            ty: Ty::ptr(result),
            operand: Operand::Local(dst),
        }
    }

    /// Address of field `index` of the struct `ptr` points to.
    pub fn field(&mut self, strukt: &Ty, ptr: &Value, index: i32, field: Ty) -> Value {
        self.gep(strukt, ptr, vec![Value::i32(0), Value::i32(index)], field)
    }

    /// Size of `ty` in bytes, as an `i64`, through the `gep null, 1` idiom.
    pub fn size_of(&mut self, ty: &Ty) -> Value {
        let end = self.gep(ty, &Value::null(Ty::ptr(ty.clone())), vec![Value::i32(1)], ty.clone());
        self.cast(CastOp::PtrToInt, &end, Ty::I64)
    }

    pub fn cast(&mut self, op: CastOp, value: &Value, to: Ty) -> Value {
        let dst = self.temp();
        self.push(Instr::Cast {
            dst: dst.clone(),
            op,
            value: value.clone(),
            to: to.clone(),
        });
        Value {
            ty: to,
            operand: Operand::Local(dst),
        }
    }

    pub fn br(&mut self, target: BlockId) {
        let label = self.label(target);
        self.terminate(Terminator::Br(label));
    }

    /// Branches to `target` unless the current block already left.
    pub fn br_if_open(&mut self, target: BlockId) {
        if !self.is_terminated() {
            self.br(target);
        }
    }

    pub fn cond_br(&mut self, cond: &Value, then: BlockId, otherwise: BlockId) {
        let then = self.label(then);
        let otherwise = self.label(otherwise);
        self.terminate(Terminator::CondBr {
            cond: cond.clone(),
            then,
            otherwise,
        });
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(Terminator::Ret(value));
    }

    pub fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }

    /// Closes every open block with a return of the zero value of the
    /// function's return type.
    pub fn finish(mut self) -> Function {
        let default = match &self.function.ret {
            Ty::Void => None,
            Ty::I1 => Some(Value::bool(false)),
            Ty::I32 => Some(Value::i32(0)),
            Ty::I64 => Some(Value::i64(0)),
            ty => Some(Value::null(ty.clone())),
        };
        for block in &mut self.function.blocks {
            if block.terminator.is_none() {
                block.terminator = Some(Terminator::Ret(default.clone()));
            }
        }
        self.function
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_print_function() {
        let mut b = FunctionBuilder::new("inc".into(), Ty::I32, vec![("arg.x".into(), Ty::I32)]);
        let slot = b.alloca("x.addr", Ty::I32);
        b.store(b.param(0), &slot);
        let x = b.load(&slot);
        let y = b.binary(BinOp::Add, &x, &Value::i32(1));
        b.ret(Some(y));

        let mut module = Module::new();
        module.functions.push(b.finish());
        assert_eq!(
            module.to_string().trim_start(),
            indoc::indoc! {"
                define i32 @inc(i32 %arg.x) {
                entry:
                  %x.addr = alloca i32
                  store i32 %arg.x, ptr %x.addr
                  %t0 = load i32, ptr %x.addr
                  %t1 = add i32 %t0, 1
                  ret i32 %t1
                }
            "}
        );
    }

    #[test]
    fn test_dead_code_gets_own_block() {
        let mut b = FunctionBuilder::new("f".into(), Ty::Void, Vec::new());
        b.ret(None);
        b.ret(None);
        let func = b.finish();
        assert_eq!(func.blocks.len(), 2);
        assert_eq!(&*func.blocks[1].label, "dead.0");
        assert!(func.blocks.iter().all(|block| block.terminator.is_some()));
    }

    #[test]
    fn test_finish_adds_default_return() {
        let b = FunctionBuilder::new("g".into(), Ty::ptr(Ty::I8), Vec::new());
        let func = b.finish();
        assert_eq!(
            func.blocks[0].terminator,
            Some(Terminator::Ret(Some(Value::null(Ty::ptr(Ty::I8)))))
        );
    }

    #[test]
    fn test_strings_are_shared_and_escaped() {
        let mut module = Module::new();
        let a = module.add_string("a\"b\n");
        let b = module.add_string("a\"b\n");
        assert_eq!(a, b);
        assert_eq!(module.globals.len(), 1);
        assert_eq!(
            module.to_string().lines().nth(1),
            Some(r#"@.str.0 = private unnamed_addr constant [5 x i8] c"a\22b\0A\00""#)
        );
    }

    #[test]
    fn test_print_calls() {
        let printf = Callee::variadic("printf", Ty::I32, vec![Ty::ptr(Ty::I8)]);
        let instr = Instr::Call {
            dst: Some("t0".into()),
            callee: printf,
            args: vec![Value::global(".str.0".into(), Ty::ptr(Ty::I8)), Value::bool(true)],
        };
        assert_eq!(
            instr.to_string(),
            "%t0 = call i32 (ptr, ...) @printf(ptr @.str.0, i1 true)"
        );
    }

    #[test]
    fn test_slot_names_are_unique() {
        let mut b = FunctionBuilder::new("f".into(), Ty::Void, Vec::new());
        let first = b.alloca("tmp", Ty::I1);
        let second = b.alloca("tmp", Ty::I1);
        assert_eq!(first.bare().to_string(), "%tmp");
        assert_eq!(second.bare().to_string(), "%tmp.1");
    }
}
