//! C runtime externs and the helper functions every module carries.

use std::rc::Rc;

use log::trace;

use crate::codegen::{
    ir::{BinOp, Callee, CastOp, FunctionBuilder, IntPredicate, Module, Ty, Value},
    type_env::ListShape,
    Options,
};

pub const LEN_OF_NONE: &str = "TypeError: object of type 'NoneType' has no len()\n";
pub const DIVISION_BY_ZERO: &str = "ZeroDivisionError: integer division or modulo by zero\n";

/// Every extern and helper the generated code calls.
pub struct Runtime {
    pub printf: Callee,
    pub scanf: Callee,
    pub strcat: Callee,
    pub strcpy: Callee,
    pub strcmp: Callee,
    pub strlen: Callee,
    pub exit: Callee,
    pub malloc: Callee,
    pub memcpy: Callee,
    pub sprintf: Callee,

    pub printint: Callee,
    pub printbool: Callee,
    pub printstr: Callee,
    pub floordiv: Callee,
    pub newint: Callee,
    pub newbool: Callee,
    pub input: Callee,
    pub str_concat: Callee,
    pub str_char_at: Callee,
    pub str_eq: Callee,
}

const EXTERNS: [&str; 10] = [
    "printf", "scanf", "strcat", "strcpy", "strcmp", "strlen", "exit", "malloc", "memcpy",
    "sprintf",
];

const HELPERS: [&str; 10] = [
    "printint",
    "printbool",
    "printstr",
    "floordiv",
    "newint",
    "newbool",
    "input",
    "str_concat",
    "str_char_at",
    "str_eq",
];

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        let s = || Ty::ptr(Ty::I8);
        let bytes = s;
        Runtime {
            printf: Callee::variadic("printf", Ty::I32, vec![s()]),
            scanf: Callee::variadic("scanf", Ty::I32, vec![s()]),
            strcat: Callee::new("strcat", s(), vec![s(), s()]),
            strcpy: Callee::new("strcpy", s(), vec![s(), s()]),
            strcmp: Callee::new("strcmp", Ty::I32, vec![s(), s()]),
            strlen: Callee::new("strlen", Ty::I64, vec![s()]),
            exit: Callee::new("exit", Ty::Void, vec![Ty::I32]),
            malloc: Callee::new("malloc", bytes(), vec![Ty::I64]),
            memcpy: Callee::new("memcpy", bytes(), vec![bytes(), bytes(), Ty::I64]),
            sprintf: Callee::variadic("sprintf", Ty::I32, vec![s(), s()]),

            printint: Callee::new("printint", Ty::I32, vec![Ty::I32]),
            printbool: Callee::new("printbool", Ty::I32, vec![Ty::I1]),
            printstr: Callee::new("printstr", Ty::I32, vec![s()]),
            floordiv: Callee::new("floordiv", Ty::I32, vec![Ty::I32, Ty::I32]),
            newint: Callee::new("newint", Ty::I32, vec![Ty::I32]),
            newbool: Callee::new("newbool", Ty::I1, vec![Ty::I1]),
            input: Callee::new("input", s(), Vec::new()),
            str_concat: Callee::new("str_concat", s(), vec![s(), s()]),
            str_char_at: Callee::new("str_char_at", s(), vec![s(), Ty::I32]),
            str_eq: Callee::new("str_eq", Ty::I1, vec![s(), s()]),
        }
    }

    fn externs(&self) -> [&Callee; 10] {
        [
            &self.printf,
            &self.scanf,
            &self.strcat,
            &self.strcpy,
            &self.strcmp,
            &self.strlen,
            &self.exit,
            &self.malloc,
            &self.memcpy,
            &self.sprintf,
        ]
    }

    /// Whether `name` is taken by an extern, a helper or `main`, so a user
    /// symbol can't be emitted under it.
    pub fn is_reserved(name: &str) -> bool {
        let list_helper = name
            .strip_prefix("list")
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));
        list_helper || name == "main" || HELPERS.contains(&name) || EXTERNS.contains(&name)
    }

    pub fn list_len(shape: &ListShape) -> Callee {
        Callee::new(&shape.helper("len"), Ty::I32, vec![shape.ptr_ty()])
    }

    pub fn list_elemptr(shape: &ListShape) -> Callee {
        Callee::new(
            &shape.helper("elemptr"),
            Ty::ptr(shape.elem.clone()),
            vec![shape.ptr_ty(), Ty::I32],
        )
    }

    pub fn list_concat(shape: &ListShape) -> Callee {
        Callee::new(
            &shape.helper("concat"),
            shape.ptr_ty(),
            vec![shape.ptr_ty(), shape.ptr_ty()],
        )
    }

    pub fn declare_externs(&self, module: &mut Module) {
        for ext in self.externs() {
            module.declare(ext);
        }
    }

    /// Emits the helpers that don't depend on list shapes.
    pub fn emit_helpers(&self, module: &mut Module, options: &Options) {
        self.emit_print(module, &self.printint, "%d\n", None);
        self.emit_print(module, &self.printbool, "%s\n", Some(("True", "False")));
        self.emit_print(module, &self.printstr, "%s\n", None);
        self.emit_floordiv(module);
        emit_identity(module, &self.newint);
        emit_identity(module, &self.newbool);
        self.emit_input(module, options);
        self.emit_str_concat(module);
        self.emit_str_char_at(module);
        self.emit_str_eq(module);
    }

    fn emit_print(&self, module: &mut Module, callee: &Callee, fmt: &str, bool_names: Option<(&str, &str)>) {
        let fmt = module.add_string(fmt);
        let mut b = builder(callee, &["x"]);
        let mut arg = b.param(0);
        if let Some((yes, no)) = bool_names {
            let yes = module.add_string(yes);
            let no = module.add_string(no);
            arg = b.select(&arg, yes, no);
        }
        let written = b.call_value(&self.printf, vec![fmt, arg]);
        b.ret(Some(written));
        finish(module, b);
    }

    fn emit_floordiv(&self, module: &mut Module) {
        let msg = module.add_string(DIVISION_BY_ZERO);
        let mut b = builder(&self.floordiv, &["a", "b"]);
        let (a, d) = (b.param(0), b.param(1));
        let error = b.append_block("div.zero".into());
        let ok = b.append_block("div.ok".into());

        let is_zero = b.icmp(IntPredicate::Eq, &d, &Value::i32(0));
        b.cond_br(&is_zero, error, ok);

        b.position_at_end(error);
        self.abort(&mut b, msg);

        // Truncated quotient, minus one when the remainder and the divisor
        // have different signs.
        b.position_at_end(ok);
        let q = b.binary(BinOp::SDiv, &a, &d);
        let r = b.binary(BinOp::SRem, &a, &d);
        let inexact = b.icmp(IntPredicate::Ne, &r, &Value::i32(0));
        let r_neg = b.icmp(IntPredicate::Slt, &r, &Value::i32(0));
        let d_neg = b.icmp(IntPredicate::Slt, &d, &Value::i32(0));
        let signs_differ = b.binary(BinOp::Xor, &r_neg, &d_neg);
        let adjust = b.binary(BinOp::And, &inexact, &signs_differ);
        let adjust = b.cast(CastOp::Zext, &adjust, Ty::I32);
        let floor = b.binary(BinOp::Sub, &q, &adjust);
        b.ret(Some(floor));
        finish(module, b);
    }

    fn emit_input(&self, module: &mut Module, options: &Options) {
        let width = options.string_buffer_len.saturating_sub(1).max(1);
        let fmt = module.add_string(&format!("%{width}s"));
        let mut b = builder(&self.input, &[]);
        let size = i64::try_from(options.string_buffer_len.max(2)).unwrap_or(i64::MAX);
        let buf = b.call_value(&self.malloc, vec![Value::i64(size)]);
        b.call_value(&self.scanf, vec![fmt, buf.clone()]);
        b.ret(Some(buf));
        finish(module, b);
    }

    fn emit_str_concat(&self, module: &mut Module) {
        let mut b = builder(&self.str_concat, &["a", "b"]);
        let (a, s) = (b.param(0), b.param(1));
        let a_len = b.call_value(&self.strlen, vec![a.clone()]);
        let s_len = b.call_value(&self.strlen, vec![s.clone()]);
        let len = b.binary(BinOp::Add, &a_len, &s_len);
        let size = b.binary(BinOp::Add, &len, &Value::i64(1));
        let buf = b.call_value(&self.malloc, vec![size]);
        b.call_value(&self.strcpy, vec![buf.clone(), a]);
        b.call_value(&self.strcat, vec![buf.clone(), s]);
        b.ret(Some(buf));
        finish(module, b);
    }

    fn emit_str_char_at(&self, module: &mut Module) {
        let mut b = builder(&self.str_char_at, &["s", "i"]);
        let (s, i) = (b.param(0), b.param(1));
        let buf = b.call_value(&self.malloc, vec![Value::i64(2)]);
        let src = b.gep(&Ty::I8, &s, vec![i], Ty::I8);
        let c = b.load(&src);
        b.store(c, &buf);
        let end = b.gep(&Ty::I8, &buf, vec![Value::i32(1)], Ty::I8);
        b.store(Value { ty: Ty::I8, ..Value::i32(0) }, &end);
        b.ret(Some(buf));
        finish(module, b);
    }

    fn emit_str_eq(&self, module: &mut Module) {
        let mut b = builder(&self.str_eq, &["a", "b"]);
        let args = vec![b.param(0), b.param(1)];
        let order = b.call_value(&self.strcmp, args);
        let eq = b.icmp(IntPredicate::Eq, &order, &Value::i32(0));
        b.ret(Some(eq));
        finish(module, b);
    }

    /// Emits `len`, `elemptr` and `concat` for one list shape.
    pub fn emit_list_helpers(&self, module: &mut Module, shape: &ListShape) {
        self.emit_list_len(module, shape);
        emit_list_elemptr(module, shape);
        self.emit_list_concat(module, shape);
    }

    fn emit_list_len(&self, module: &mut Module, shape: &ListShape) {
        let msg = module.add_string(LEN_OF_NONE);
        let mut b = builder(&Runtime::list_len(shape), &["list"]);
        let list = b.param(0);
        let check = b.append_block("len.check".into());
        let ok = b.append_block("len.ok".into());
        let error = b.append_block("len.none".into());

        let is_null = b.icmp(IntPredicate::Eq, &list, &Value::null(list.ty.clone()));
        b.cond_br(&is_null, error, check);

        b.position_at_end(check);
        let init = b.field(&shape.ty(), &list, ListShape::INIT, Ty::I1);
        let init = b.load(&init);
        b.cond_br(&init, ok, error);

        b.position_at_end(ok);
        let size = b.field(&shape.ty(), &list, ListShape::SIZE, Ty::I32);
        let size = b.load(&size);
        b.ret(Some(size));

        b.position_at_end(error);
        self.abort(&mut b, msg);
        finish(module, b);
    }

    fn emit_list_concat(&self, module: &mut Module, shape: &ListShape) {
        let mut b = builder(&Runtime::list_concat(shape), &["a", "b"]);
        let len = Runtime::list_len(shape);
        let elem_size = b.size_of(&shape.elem);

        let mut parts = Vec::new();
        for i in 0..2 {
            let list = b.param(i);
            let n = b.call_value(&len, vec![list.clone()]);
            let content = b.field(&shape.ty(), &list, ListShape::CONTENT, Ty::ptr(shape.elem.clone()));
            let content = b.load(&content);
            let wide = b.cast(CastOp::Sext, &n, Ty::I64);
            let bytes = b.binary(BinOp::Mul, &wide, &elem_size);
            parts.push((n, content, bytes));
        }
        let total = b.binary(BinOp::Add, &parts[0].0, &parts[1].0);
        let wide = b.cast(CastOp::Sext, &total, Ty::I64);
        let bytes = b.binary(BinOp::Mul, &wide, &elem_size);
        let content = b.call_value(&self.malloc, vec![bytes]);
        let content = content.retyped(Ty::ptr(shape.elem.clone()));

        let (a_len, a_content, a_bytes) = &parts[0];
        let (_, b_content, b_bytes) = &parts[1];
        b.call_value(&self.memcpy, vec![content.clone(), a_content.clone(), a_bytes.clone()]);
        let tail = b.gep(&shape.elem, &content, vec![a_len.clone()], shape.elem.clone());
        b.call_value(&self.memcpy, vec![tail, b_content.clone(), b_bytes.clone()]);

        let list = new_list(&mut b, self, shape, content, total);
        b.ret(Some(list));
        finish(module, b);
    }

    /// Prints `msg` and exits the process.
    fn abort(&self, b: &mut FunctionBuilder, msg: Value) {
        b.call_value(&self.printf, vec![msg]);
        b.call(&self.exit, vec![Value::i32(0)]);
        b.unreachable();
    }
}

/// Allocates a list struct of `shape` holding `size` elements of `content`.
pub fn new_list(
    b: &mut FunctionBuilder,
    runtime: &Runtime,
    shape: &ListShape,
    content: Value,
    size: Value,
) -> Value {
    let struct_size = b.size_of(&shape.ty());
    let list = b.call_value(&runtime.malloc, vec![struct_size]);
    let list = list.retyped(shape.ptr_ty());
    let elems = Ty::ptr(shape.elem.clone());
    let field = b.field(&shape.ty(), &list, ListShape::CONTENT, elems);
    b.store(content, &field);
    let field = b.field(&shape.ty(), &list, ListShape::SIZE, Ty::I32);
    b.store(size, &field);
    let field = b.field(&shape.ty(), &list, ListShape::INIT, Ty::I1);
    b.store(Value::bool(true), &field);
    list
}

fn emit_list_elemptr(module: &mut Module, shape: &ListShape) {
    let mut b = builder(&Runtime::list_elemptr(shape), &["list", "i"]);
    let (list, i) = (b.param(0), b.param(1));
    let content = b.field(&shape.ty(), &list, ListShape::CONTENT, Ty::ptr(shape.elem.clone()));
    let content = b.load(&content);
    let elem = b.gep(&shape.elem, &content, vec![i], shape.elem.clone());
    b.ret(Some(elem));
    finish(module, b);
}

fn emit_identity(module: &mut Module, callee: &Callee) {
    let mut b = builder(callee, &["x"]);
    let slot = b.alloca("x.addr", callee.ret.clone());
    let x = b.param(0);
    b.store(x, &slot);
    let x = b.load(&slot);
    b.ret(Some(x));
    finish(module, b);
}

fn builder(callee: &Callee, params: &[&str]) -> FunctionBuilder {
    let params = (params.iter().zip(&callee.params))
        .map(|(name, ty)| (Rc::from(format!("arg.{name}")), ty.clone()))
        .collect();
    FunctionBuilder::new(callee.name.clone(), callee.ret.clone(), params)
}

fn finish(module: &mut Module, b: FunctionBuilder) {
    let func = b.finish();
    trace!("emitted helper {}", func.name);
    module.functions.push(func);
}
