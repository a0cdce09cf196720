use std::{collections::HashMap, mem, rc::Rc};

use log::{debug, trace};

use crate::{
    ast::{
        BinaryOperator, Declaration, Definition, Expr, ExprKind, FuncDef, Ident, Literal, Program,
        Stmt, StmtKind, UnaryOperator, VarDef,
    },
    codegen::{
        ir::{BinOp, Callee, CastOp, FunctionBuilder, Init, IntPredicate, Module, Operand, Ty, Value},
        runtime::{self, Runtime},
        type_env::TypeEnv,
        Error, Options,
    },
    token::{Span, Spanned},
    type_checker::{self, TypeHints},
    types::ValueType,
    util::intern::{well_known, Interner, Symbol},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// What an expression lowers to: a value, or the address of a variable or
/// list element holding it.
enum Lowered {
    Value(Value),
    Place(Value),
}

pub struct Generator<'a> {
    hints: &'a TypeHints,
    ident_interner: &'a Interner,
    runtime: Runtime,
    module: Module,
    types: TypeEnv,
    /// The function being emitted; `main` outside of definitions.
    b: FunctionBuilder,
    globals: HashMap<Symbol, Value>,
    /// Slots of the current function, if not in `main`.
    locals: Option<HashMap<Symbol, Value>>,
    functions: HashMap<Symbol, Callee>,
    none_lists: HashMap<Rc<str>, Value>,
}

impl<'a> Generator<'a> {
    pub fn new(
        program: &Program,
        hints: &'a TypeHints,
        ident_interner: &'a Interner,
        options: &Options,
    ) -> Generator<'a> {
        let runtime = Runtime::new();
        let mut module = Module::new();
        runtime.declare_externs(&mut module);
        runtime.emit_helpers(&mut module, options);
        Generator {
            hints,
            ident_interner,
            runtime,
            module,
            types: TypeEnv::build(program, hints),
            b: FunctionBuilder::new("main".into(), Ty::I32, Vec::new()),
            globals: HashMap::new(),
            locals: None,
            functions: HashMap::new(),
            none_lists: HashMap::new(),
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<Module> {
        self.g_signatures(program);
        for definition in &program.definitions {
            match definition {
                Definition::Var(var_def) => self.g_global(var_def)?,
                Definition::Func(func_def) => self.g_func_def(func_def)?,
            }
        }
        self.g_stmts(&program.statements)?;
        self.b.ret(Some(Value::i32(0)));
        let main = self.b.finish();
        self.module.functions.push(main);

        for shape in self.types.shapes() {
            self.runtime.emit_list_helpers(&mut self.module, shape);
        }
        self.types.define_types(&mut self.module);
        debug!(
            "generated {} functions over {} list shapes",
            self.module.functions.len(),
            self.types.shapes().len()
        );
        Ok(self.module)
    }

    /// The name a user symbol is emitted under.
    fn symbol(&self, name: Symbol) -> Rc<str> {
        let name = self.ident_interner.get(name);
        if Runtime::is_reserved(name) {
            format!("{name}.user").into()
        } else {
            name.into()
        }
    }

    fn hint(&self, expr: &Expr) -> &'a ValueType {
        self.hints.of(expr)
    }

    fn var(&self, ident: Ident) -> Result<Value> {
        (self.locals.as_ref())
            .and_then(|locals| locals.get(&ident.name))
            .or_else(|| self.globals.get(&ident.name))
            .cloned()
            .ok_or_else(|| ident.span.wrap(Error::UnknownSymbol(ident.name)))
    }
}

/// Definitions.
impl Generator<'_> {
    fn g_signatures(&mut self, program: &Program) {
        for definition in &program.definitions {
            let Definition::Func(func_def) = definition else {
                continue;
            };
            let signature = type_checker::signature(func_def);
            let params = (signature.params.iter())
                .map(|param| self.types.ty(param))
                .collect();
            let ret = self.types.ty(&signature.ret);
            let name = self.symbol(func_def.name.name);
            let callee = Callee {
                name,
                ret,
                params,
                variadic: false,
            };
            self.functions.insert(func_def.name.name, callee);
        }
    }

    fn g_global(&mut self, var_def: &VarDef) -> Result<()> {
        let declared = ValueType::from_annotation(&var_def.var.ty);
        let ty = self.types.ty(&declared);
        let literal = literal_of(var_def)?;
        let constant = self.constant(literal, &declared, &ty);
        let init = constant.clone().unwrap_or_else(|| zero(&ty));
        let name = self.symbol(var_def.var.name.name);
        let global = self.module.add_global(name, Init::Value(init));
        if constant.is_none() {
            // Boxed initial values only exist at runtime.
            let value = self.g_literal(literal)?;
            let value = self.coerce(value, &ty, var_def.value.span)?;
            self.b.store(value, &global);
        }
        self.globals.insert(var_def.var.name.name, global);
        Ok(())
    }

    fn g_local(&mut self, var_def: &VarDef) -> Result<()> {
        let declared = ValueType::from_annotation(&var_def.var.ty);
        let ty = self.types.ty(&declared);
        let literal = literal_of(var_def)?;
        let name = self.ident_interner.get(var_def.var.name.name);
        let slot = self.b.alloca(&format!("{name}.addr"), ty.clone());
        let value = match self.constant(literal, &declared, &ty) {
            Some(value) if matches!(literal, Literal::None) => value,
            _ => self.g_literal(literal)?,
        };
        let value = self.coerce(value, &ty, var_def.value.span)?;
        self.b.store(value, &slot);
        self.locals
            .get_or_insert_with(HashMap::new)
            .insert(var_def.var.name.name, slot);
        Ok(())
    }

    /// The constant a variable of type `declared` starts with, if `literal`
    /// can be stored without boxing.
    fn constant(&mut self, literal: &Literal, declared: &ValueType, ty: &Ty) -> Option<Value> {
        match (literal, ty) {
            (Literal::Int(n), Ty::I32) => Some(Value::i32(*n)),
            (Literal::Bool(b), Ty::I1) => Some(Value::bool(*b)),
            (Literal::Str(s), Ty::Ptr(_)) => Some(self.module.add_string(s).retyped(ty.clone())),
            (Literal::None, Ty::Ptr(_)) => match declared {
                ValueType::List(elem) => Some(self.none_list(elem)),
                _ => Some(Value::null(ty.clone())),
            },
            _ => None,
        }
    }

    /// A list that was never initialized, shared by every `None` list
    /// variable of its shape.
    fn none_list(&mut self, elem: &ValueType) -> Value {
        let shape = self.types.shape(elem);
        if let Some(list) = self.none_lists.get(&shape.name) {
            return list.clone();
        }
        let init = Value {
            ty: shape.ty(),
            operand: Operand::Zero,
        };
        let name = format!(".none.{}", shape.name).into();
        let list = self.module.add_global(name, Init::Value(init));
        self.none_lists.insert(shape.name, list.clone());
        list
    }

    fn g_func_def(&mut self, func_def: &FuncDef) -> Result<()> {
        let name = func_def.name;
        let callee = (self.functions.get(&name.name).cloned())
            .ok_or_else(|| name.span.wrap(Error::UnknownSymbol(name.name)))?;
        let params = (func_def.params.iter().zip(&callee.params))
            .map(|(param, ty)| {
                let name = self.ident_interner.get(param.name.name);
                (Rc::from(format!("arg.{name}")), ty.clone())
            })
            .collect();
        let builder = FunctionBuilder::new(callee.name.clone(), callee.ret.clone(), params);
        let main = mem::replace(&mut self.b, builder);

        let mut locals = HashMap::new();
        for (i, param) in func_def.params.iter().enumerate() {
            let name = self.ident_interner.get(param.name.name);
            let slot = self.b.alloca(&format!("{name}.addr"), callee.params[i].clone());
            let arg = self.b.param(i);
            self.b.store(arg, &slot);
            locals.insert(param.name.name, slot);
        }
        self.locals = Some(locals);

        for declaration in &func_def.declarations {
            if let Declaration::Var(var_def) = declaration {
                self.g_local(var_def)?;
            }
        }
        self.g_stmts(&func_def.body)?;

        let func = mem::replace(&mut self.b, main).finish();
        self.locals = None;
        trace!("generated function {} ({} blocks)", func.name, func.blocks.len());
        self.module.functions.push(func);
        Ok(())
    }
}

/// Statements.
impl Generator<'_> {
    fn g_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.g_stmt(stmt)?;
        }
        Ok(())
    }

    fn g_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let id = self.b.label_id();
                let then_block = self.b.append_block(format!("then.{id}"));
                let else_block = self.b.append_block(format!("else.{id}"));
                let exit = self.b.append_block(format!("exit.{id}"));

                let cond = self.g_value(cond)?;
                self.b.cond_br(&cond, then_block, else_block);

                self.b.position_at_end(then_block);
                self.g_stmts(then_body)?;
                self.b.br_if_open(exit);

                self.b.position_at_end(else_block);
                self.g_stmts(else_body)?;
                self.b.br_if_open(exit);

                self.b.position_at_end(exit);
            }
            StmtKind::While { cond, body } => {
                let id = self.b.label_id();
                let cond_block = self.b.append_block(format!("while.cond.{id}"));
                let body_block = self.b.append_block(format!("while.body.{id}"));
                let exit = self.b.append_block(format!("while.exit.{id}"));

                self.b.br(cond_block);
                self.b.position_at_end(cond_block);
                let cond = self.g_value(cond)?;
                self.b.cond_br(&cond, body_block, exit);

                self.b.position_at_end(body_block);
                self.g_stmts(body)?;
                self.b.br_if_open(cond_block);

                self.b.position_at_end(exit);
            }
            StmtKind::For { target, iter, body } => self.g_for(*target, iter, body)?,
            StmtKind::Pass => {}
            StmtKind::Return(value) => {
                let ret = self.b.ret_ty().clone();
                let value = match value {
                    Some(value) => self.g_value(value)?,
                    None => Value::null(ret.clone()),
                };
                let value = self.coerce(value, &ret, stmt.span)?;
                self.b.ret(Some(value));
            }
            StmtKind::Assign { targets, value } => {
                let value = self.g_value(value)?;
                for target in targets {
                    let Lowered::Place(ptr) = self.g_expr(target)? else {
                        return Err(target.span.wrap(Error::Unsupported("assignment to a value")));
                    };
                    // SAFETY: Places are always pointers.
                    let slot_ty = ptr.ty.pointee().unwrap().clone();
                    let value = self.coerce(value.clone(), &slot_ty, target.span)?;
                    self.b.store(value, &ptr);
                }
            }
            StmtKind::Expr(expr) => {
                self.g_expr(expr)?;
            }
        }
        Ok(())
    }

    fn g_for(&mut self, target: Ident, iter: &Expr, body: &[Stmt]) -> Result<()> {
        let iter_ty = self.hint(iter);
        let seq = self.g_value(iter)?;
        let slot = self.var(target)?;
        let index = self.b.alloca("for.idx", Ty::I32);
        self.b.store(Value::i32(0), &index);

        let id = self.b.label_id();
        let cond_block = self.b.append_block(format!("for.cond.{id}"));
        let body_block = self.b.append_block(format!("for.body.{id}"));
        let inc_block = self.b.append_block(format!("for.inc.{id}"));
        let exit = self.b.append_block(format!("for.exit.{id}"));
        self.b.br(cond_block);

        self.b.position_at_end(cond_block);
        let i = self.b.load(&index);
        let len = self.g_length(&seq, iter_ty, iter.span)?;
        let more = self.b.icmp(IntPredicate::Slt, &i, &len);
        self.b.cond_br(&more, body_block, exit);

        self.b.position_at_end(body_block);
        let i = self.b.load(&index);
        let elem = match self.g_index(seq, iter_ty, i, iter.span)? {
            Lowered::Value(value) => value,
            Lowered::Place(ptr) => self.b.load(&ptr),
        };
        // SAFETY: Variables are always slots.
        let slot_ty = slot.ty.pointee().unwrap().clone();
        let elem = self.coerce(elem, &slot_ty, target.span)?;
        self.b.store(elem, &slot);
        self.g_stmts(body)?;
        self.b.br_if_open(inc_block);

        self.b.position_at_end(inc_block);
        let i = self.b.load(&index);
        let next = self.b.binary(BinOp::Add, &i, &Value::i32(1));
        self.b.store(next, &index);
        self.b.br(cond_block);

        self.b.position_at_end(exit);
        Ok(())
    }
}

/// Expressions.
impl Generator<'_> {
    /// Lowers `expr` and loads the result if it's a place.
    fn g_value(&mut self, expr: &Expr) -> Result<Value> {
        let lowered = self.g_expr(expr)?;
        Ok(self.load_val(lowered))
    }

    fn load_val(&mut self, lowered: Lowered) -> Value {
        match lowered {
            Lowered::Value(value) => value,
            Lowered::Place(ptr) => self.b.load(&ptr),
        }
    }

    fn g_expr(&mut self, expr: &Expr) -> Result<Lowered> {
        let value = match &expr.kind {
            ExprKind::Literal(literal) => self.g_literal(literal)?,
            ExprKind::Ident(ident) => return Ok(Lowered::Place(self.var(*ident)?)),
            ExprKind::Unary { op, expr } => {
                let value = self.g_value(expr)?;
                match op {
                    UnaryOperator::Neg => self.b.binary(BinOp::Sub, &Value::i32(0), &value),
                    UnaryOperator::Not => self.b.binary(BinOp::Xor, &value, &Value::bool(true)),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => self.g_binary(expr, *op, lhs, rhs)?,
            ExprKind::IfExpr {
                cond,
                then_arm,
                else_arm,
            } => {
                let hint = self.hint(expr);
                let ty = self.types.ty(hint);
                let slot = self.b.alloca("ifexpr", ty.clone());
                let id = self.b.label_id();
                let then_block = self.b.append_block(format!("ifexpr.then.{id}"));
                let else_block = self.b.append_block(format!("ifexpr.else.{id}"));
                let exit = self.b.append_block(format!("ifexpr.exit.{id}"));

                let cond = self.g_value(cond)?;
                self.b.cond_br(&cond, then_block, else_block);
                for (block, arm) in [(then_block, then_arm), (else_block, else_arm)] {
                    self.b.position_at_end(block);
                    let value = self.g_value(arm)?;
                    let value = self.coerce(value, &ty, arm.span)?;
                    self.b.store(value, &slot);
                    self.b.br(exit);
                }
                self.b.position_at_end(exit);
                self.b.load(&slot)
            }
            ExprKind::List(elements) => self.g_list(expr, elements)?,
            ExprKind::Call { func, args } => self.g_call(*func, args)?,
            ExprKind::Index { value, index } => {
                let ty = self.hint(value);
                let seq = self.g_value(value)?;
                let index = self.g_value(index)?;
                return self.g_index(seq, ty, index, expr.span);
            }
        };
        Ok(Lowered::Value(value))
    }

    fn g_literal(&mut self, literal: &Literal) -> Result<Value> {
        let value = match literal {
            Literal::None => Value::null(Ty::ptr(Ty::named("none"))),
            Literal::Bool(b) => self.b.call_value(&self.runtime.newbool, vec![Value::bool(*b)]),
            Literal::Int(n) => self.b.call_value(&self.runtime.newint, vec![Value::i32(*n)]),
            Literal::Str(s) => {
                let constant = self.module.add_string(s);
                let fmt = self.module.add_string("%s");
                let size = i64::try_from(s.len() + 1).unwrap_or(i64::MAX);
                let buf = self.b.call_value(&self.runtime.malloc, vec![Value::i64(size)]);
                self.b.call_value(&self.runtime.sprintf, vec![buf.clone(), fmt, constant]);
                buf
            }
        };
        Ok(value)
    }

    fn g_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOperator,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Value> {
        use BinaryOperator as B;

        if let B::And | B::Or = op {
            return self.g_short_circuit(op, lhs, rhs);
        }
        let (lhs_ty, rhs_ty) = (self.hint(lhs), self.hint(rhs));
        let l = self.g_value(lhs)?;
        let r = self.g_value(rhs)?;
        let value = match op {
            B::Add => match self.hint(expr) {
                ValueType::Int => self.b.binary(BinOp::Add, &l, &r),
                ValueType::Str => self.b.call_value(&self.runtime.str_concat, vec![l, r]),
                ValueType::List(elem) => {
                    return self.g_list_concat(elem, lhs_ty, rhs_ty, l, r, expr.span);
                }
                _ => return Err(expr.span.wrap(Error::Unsupported("`+` on these operands"))),
            },
            B::Sub => self.b.binary(BinOp::Sub, &l, &r),
            B::Mul => self.b.binary(BinOp::Mul, &l, &r),
            B::FloorDiv => self.b.call_value(&self.runtime.floordiv, vec![l, r]),
            B::Mod => {
                let q = self.b.call_value(&self.runtime.floordiv, vec![l.clone(), r.clone()]);
                let p = self.b.binary(BinOp::Mul, &r, &q);
                self.b.binary(BinOp::Sub, &l, &p)
            }
            B::Less => self.b.icmp(IntPredicate::Slt, &l, &r),
            B::LessEq => self.b.icmp(IntPredicate::Sle, &l, &r),
            B::Greater => self.b.icmp(IntPredicate::Sgt, &l, &r),
            B::GreaterEq => self.b.icmp(IntPredicate::Sge, &l, &r),
            B::Eq | B::NotEq if *lhs_ty == ValueType::Str => {
                let eq = self.b.call_value(&self.runtime.str_eq, vec![l, r]);
                if op == B::Eq {
                    eq
                } else {
                    self.b.binary(BinOp::Xor, &eq, &Value::bool(true))
                }
            }
            B::Eq | B::Is => self.b.icmp(IntPredicate::Eq, &l, &r),
            B::NotEq => self.b.icmp(IntPredicate::Ne, &l, &r),
            B::And | B::Or => unreachable!(),
        };
        Ok(value)
    }

    /// `and`/`or`, which only evaluate `rhs` if `lhs` doesn't decide.
    fn g_short_circuit(&mut self, op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> Result<Value> {
        let name = if op == BinaryOperator::And { "and" } else { "or" };
        let slot = self.b.alloca(&format!("{name}.slot"), Ty::I1);
        let id = self.b.label_id();
        let rhs_block = self.b.append_block(format!("{name}.rhs.{id}"));
        let exit = self.b.append_block(format!("{name}.exit.{id}"));

        let l = self.g_value(lhs)?;
        self.b.store(l.clone(), &slot);
        if op == BinaryOperator::And {
            self.b.cond_br(&l, rhs_block, exit);
        } else {
            self.b.cond_br(&l, exit, rhs_block);
        }

        self.b.position_at_end(rhs_block);
        let r = self.g_value(rhs)?;
        self.b.store(r, &slot);
        self.b.br(exit);

        self.b.position_at_end(exit);
        Ok(self.b.load(&slot))
    }

    fn g_list_concat(
        &mut self,
        elem: &ValueType,
        lhs_ty: &ValueType,
        rhs_ty: &ValueType,
        l: Value,
        r: Value,
        span: Span,
    ) -> Result<Value> {
        let shape = self.types.shape(elem);
        // Contents are copied bytewise, so all three element types must share
        // a layout. An `<Empty>` operand has no elements to copy.
        for operand in [lhs_ty, rhs_ty] {
            if let Some(operand_elem) = operand.elem() {
                if !self.types.ty(operand_elem).same_repr(&shape.elem) {
                    return Err(span.wrap(Error::Unsupported(
                        "concatenation of lists with differently stored elements",
                    )));
                }
            }
        }
        let args = vec![l.retyped(shape.ptr_ty()), r.retyped(shape.ptr_ty())];
        Ok(self.b.call_value(&Runtime::list_concat(&shape), args))
    }

    fn g_list(&mut self, expr: &Expr, elements: &[Expr]) -> Result<Value> {
        let shape = match self.hint(expr) {
            ValueType::List(elem) => self.types.shape(elem),
            _ => self.types.empty_shape(),
        };
        let len = i32::try_from(elements.len())
            .map_err(|_| expr.span.wrap(Error::Unsupported("list literal this long")))?;

        let elem_size = self.b.size_of(&shape.elem);
        let bytes = self.b.binary(BinOp::Mul, &elem_size, &Value::i64(len.into()));
        let content = self.b.call_value(&self.runtime.malloc, vec![bytes]);
        let content = content.retyped(Ty::ptr(shape.elem.clone()));
        for (i, element) in (0..len).zip(elements) {
            let value = self.g_value(element)?;
            let value = self.coerce(value, &shape.elem, element.span)?;
            let ptr = self.b.gep(&shape.elem, &content, vec![Value::i32(i)], shape.elem.clone());
            self.b.store(value, &ptr);
        }
        Ok(runtime::new_list(&mut self.b, &self.runtime, &shape, content, Value::i32(len)))
    }

    fn g_call(&mut self, func: Ident, args: &[Expr]) -> Result<Value> {
        if func.name == well_known::PRINT {
            let [arg] = args else {
                return Err(func.span.wrap(Error::Unsupported("`print` without one argument")));
            };
            let ty = self.hint(arg);
            let value = self.g_value(arg)?;
            let (helper, value) = match ty {
                ValueType::Int => (&self.runtime.printint, value),
                ValueType::Bool => (&self.runtime.printbool, value),
                ValueType::Str => (&self.runtime.printstr, value),
                ValueType::None => (&self.runtime.printstr, self.module.add_string("None")),
                _ => return Err(arg.span.wrap(Error::Unsupported("printing a value of this type"))),
            };
            self.b.call_value(helper, vec![value]);
            return Ok(Value::null(Ty::ptr(Ty::named("none"))));
        }
        if func.name == well_known::LEN {
            let [arg] = args else {
                return Err(func.span.wrap(Error::Unsupported("`len` without one argument")));
            };
            let ty = self.hint(arg);
            let value = self.g_value(arg)?;
            return self.g_length(&value, ty, arg.span);
        }
        if func.name == well_known::INPUT {
            return Ok(self.b.call_value(&self.runtime.input, Vec::new()));
        }

        let callee = (self.functions.get(&func.name).cloned())
            .ok_or_else(|| func.span.wrap(Error::UnknownSymbol(func.name)))?;
        let mut values = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&callee.params) {
            let value = self.g_value(arg)?;
            values.push(self.coerce(value, param, arg.span)?);
        }
        Ok(self.b.call_value(&callee, values))
    }

    /// Number of characters or elements of `seq`.
    fn g_length(&mut self, seq: &Value, ty: &ValueType, span: Span) -> Result<Value> {
        let shape = match ty {
            ValueType::Str => {
                let len = self.b.call_value(&self.runtime.strlen, vec![seq.clone()]);
                return Ok(self.b.cast(CastOp::Trunc, &len, Ty::I32));
            }
            ValueType::List(elem) => self.types.shape(elem),
            ValueType::Empty => self.types.empty_shape(),
            _ => return Err(span.wrap(Error::Unsupported("length of a value of this type"))),
        };
        let list = seq.clone().retyped(shape.ptr_ty());
        Ok(self.b.call_value(&Runtime::list_len(&shape), vec![list]))
    }

    fn g_index(&mut self, seq: Value, ty: &ValueType, index: Value, span: Span) -> Result<Lowered> {
        match ty {
            ValueType::Str => {
                let value = self.b.call_value(&self.runtime.str_char_at, vec![seq, index]);
                Ok(Lowered::Value(value))
            }
            ValueType::List(elem) => {
                let shape = self.types.shape(elem);
                let list = seq.retyped(shape.ptr_ty());
                let ptr = self.b.call_value(&Runtime::list_elemptr(&shape), vec![list, index]);
                Ok(Lowered::Place(ptr))
            }
            _ => Err(span.wrap(Error::Unsupported("indexing a value of this type"))),
        }
    }

    /// Converts `value` to be stored in a slot of type `to`. Primitives
    /// stored in pointer slots are boxed.
    fn coerce(&mut self, value: Value, to: &Ty, span: Span) -> Result<Value> {
        if value.ty == *to {
            return Ok(value);
        }
        match (&value.ty, to) {
            (Ty::Ptr(_), Ty::Ptr(_)) => Ok(value.retyped(to.clone())),
            (Ty::I32 | Ty::I1, Ty::Ptr(_)) => {
                let size = self.b.size_of(&value.ty);
                let ptr = self.b.call_value(&self.runtime.malloc, vec![size]);
                let ptr = ptr.retyped(Ty::ptr(value.ty.clone()));
                self.b.store(value, &ptr);
                Ok(ptr.retyped(to.clone()))
            }
            _ => Err(span.wrap(Error::Unsupported("conversion between these types"))),
        }
    }
}

fn literal_of(var_def: &VarDef) -> Result<&Literal> {
    match &var_def.value.kind {
        ExprKind::Literal(literal) => Ok(literal),
        _ => Err(var_def
            .value
            .span
            .wrap(Error::Unsupported("variable initialized with a non-literal"))),
    }
}

fn zero(ty: &Ty) -> Value {
    match ty {
        Ty::I1 => Value::bool(false),
        Ty::I32 => Value::i32(0),
        ty => Value::null(ty.clone()),
    }
}
