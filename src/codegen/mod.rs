//! Lowers a checked program to textual LLVM IR.

use log::debug;

use crate::{
    ast::Program,
    token::Spanned,
    type_checker::TypeHints,
    util::intern::{Interner, Symbol},
};

mod generator;
pub mod ir;
mod runtime;
pub mod type_env;

pub use runtime::{DIVISION_BY_ZERO, LEN_OF_NONE};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Size of the buffer `input()` reads into, including the terminator.
    pub string_buffer_len: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            string_buffer_len: 10_000,
        }
    }
}

/// Builds the IR module of a program which passed scope and type checking.
pub fn generate(
    program: &Program,
    hints: &TypeHints,
    ident_interner: &Interner,
    options: &Options,
) -> Result<ir::Module, Spanned<Error>> {
    let module = generator::Generator::new(program, hints, ident_interner, options).generate(program)?;
    debug!("generated module with {} globals", module.globals.len());
    Ok(module)
}

/// Like [`generate`], but returns the module's text.
pub fn emit(
    program: &Program,
    hints: &TypeHints,
    ident_interner: &Interner,
    options: &Options,
) -> Result<String, Spanned<Error>> {
    generate(program, hints, ident_interner, options).map(|module| module.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A construct which type checks but has no lowering.
    Unsupported(&'static str),
    /// A name which resolved during analysis but has no storage.
    UnknownSymbol(Symbol),
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{parser::test_utils::parse_program, scope, type_checker};

    fn compile(src: &str) -> String {
        let (interner, program) = parse_program(src);
        scope::check(&program).unwrap();
        let hints = type_checker::check(&program).unwrap();
        let ir = emit(&program, &hints, &interner, &Options::default()).unwrap();
        assert_well_formed(&ir);
        ir
    }

    fn is_terminator(line: &str) -> bool {
        ["ret ", "ret void", "br ", "unreachable"]
            .iter()
            .any(|prefix| line.starts_with(prefix))
    }

    /// Every block ends in exactly one terminator, and every branch target
    /// is a block of the same function.
    #[track_caller]
    fn assert_well_formed(ir: &str) {
        let mut labels = HashSet::new();
        let mut targets = Vec::new();
        let mut block: Vec<&str> = Vec::new();
        let mut in_function = false;

        let check_block = |block: &[&str]| {
            let (last, init) = block.split_last().expect("empty block");
            assert!(is_terminator(last), "block without terminator: {block:#?}");
            assert!(
                !init.iter().any(|line| is_terminator(line)),
                "terminator inside block: {block:#?}"
            );
        };

        for line in ir.lines() {
            if line.starts_with("define ") {
                in_function = true;
                labels.clear();
                targets.clear();
                continue;
            }
            if !in_function || line.is_empty() {
                continue;
            }
            if line == "}" {
                check_block(&block);
                block.clear();
                for target in &targets {
                    assert!(labels.contains(target), "undefined label {target}");
                }
                in_function = false;
            } else if let Some(label) = line.strip_suffix(':') {
                if !block.is_empty() {
                    check_block(&block);
                    block.clear();
                }
                labels.insert(label.to_owned());
            } else {
                let line = line.trim_start();
                for part in line.split("label %").skip(1) {
                    let target = part.split(|c| c == ',' || c == ' ').next().unwrap();
                    targets.push(target.to_owned());
                }
                block.push(line);
            }
        }
    }

    fn function<'a>(ir: &'a str, name: &str) -> &'a str {
        let needle = format!(" @{name}(");
        let start = (ir.match_indices("define ").map(|(i, _)| i))
            .find(|&i| ir[i..].lines().next().unwrap().contains(&needle))
            .unwrap_or_else(|| panic!("no function {name}"));
        let end = start + ir[start..].find("\n}\n").unwrap() + 3;
        &ir[start..end]
    }

    #[test]
    fn test_print_sum() {
        let ir = compile("print(1 + 2)\n");
        assert_eq!(
            function(&ir, "main"),
            indoc::indoc! {"
                define i32 @main() {
                entry:
                  %t0 = call i32 @newint(i32 1)
                  %t1 = call i32 @newint(i32 2)
                  %t2 = add i32 %t0, %t1
                  %t3 = call i32 @printint(i32 %t2)
                  ret i32 0
                }
            "}
        );
    }

    #[test]
    fn test_while_loop() {
        let ir = compile("x: int = 0\nwhile x < 3:\n    print(x)\n    x = x + 1\n");
        assert!(ir.contains("@x = global i32 0\n"));
        let main = function(&ir, "main");
        assert!(main.contains("br label %while.cond.0"));
        assert!(main.contains("br i1 %t2, label %while.body.0, label %while.exit.0"));
        assert!(main.contains("store i32 %t7, ptr @x"));
    }

    #[test]
    fn test_function_definition() {
        let ir = compile("def f(a: int) -> int:\n    return a * 2\nprint(f(21))\n");
        assert_eq!(
            function(&ir, "f"),
            indoc::indoc! {"
                define i32 @f(i32 %arg.a) {
                entry:
                  %a.addr = alloca i32
                  store i32 %arg.a, ptr %a.addr
                  %t0 = load i32, ptr %a.addr
                  %t1 = call i32 @newint(i32 2)
                  %t2 = mul i32 %t0, %t1
                  ret i32 %t2
                }
            "}
        );
        assert!(function(&ir, "main").contains("call i32 @f(i32 %t0)"));
    }

    #[test]
    fn test_string_concatenation() {
        let ir = compile("s: str = \"\"\ns = \"ab\" + \"c\"\nprint(s)\n");
        assert!(ir.contains("call ptr @str_concat(ptr"));
        assert!(ir.contains("call i32 @printstr(ptr"));
    }

    #[test]
    fn test_none_list_length() {
        let ir = compile("xs: [int] = None\nprint(len(xs))\n");
        assert!(ir.contains("%list0 = type { ptr, i32, i1 }\n"));
        assert!(ir.contains("@.none.list0 = global %list0 zeroinitializer\n"));
        assert!(ir.contains("@xs = global ptr @.none.list0\n"));
        assert!(function(&ir, "main").contains("call i32 @list0_len(ptr %t0)"));
        assert!(function(&ir, "list0_len").contains("call void @exit(i32 0)"));
    }

    #[test]
    fn test_lists() {
        let ir = compile(indoc::indoc! {"
            xs: [int] = None
            x: int = 0
            xs = [1, 2] + [3]
            xs[0] = 4
            for x in xs:
                print(x)
        "});
        let main = function(&ir, "main");
        assert!(main.contains("call ptr @list0_concat(ptr"));
        assert!(main.contains("call ptr @list0_elemptr(ptr"));
        assert!(main.contains("for.body.0:"));
        assert!(main.contains("for.inc.0:"));
    }

    #[test]
    fn test_boxing_into_object() {
        let ir = compile("o: object = 1\nos: [object] = None\nos = [True, None]\n");
        assert!(ir.contains("@o = global ptr null\n"));
        let main = function(&ir, "main");
        assert!(main.contains("store i32 %t0, ptr %t3"));
        assert!(main.contains("store ptr %t3, ptr @o"));
        assert!(main.contains("store i1"));
    }

    #[test]
    fn test_control_flow_blocks_are_well_formed() {
        compile(indoc::indoc! {"
            def f(n: int) -> bool:
                while n > 0:
                    if n % 2 == 0:
                        return True
                    elif n < 0 or not n == 1:
                        pass
                    else:
                        return n // 2 > 1 if n > 4 else False
                    n = n - 1
                return False
            print(f(10))
        "});
    }

    #[test]
    fn test_strings() {
        let ir = compile(indoc::indoc! {r#"
            s: str = "hi"
            c: str = ""
            for c in s:
                print(c == "h")
            print(s[1] != c)
            print(len(s))
        "#});
        let main = function(&ir, "main");
        assert!(main.contains("call ptr @str_char_at(ptr"));
        assert!(main.contains("call i1 @str_eq(ptr"));
        assert!(main.contains("call i64 @strlen(ptr"));
        assert!(ir.contains(r#"@s = global ptr @.str."#));
    }

    #[test]
    fn test_reserved_names_are_renamed() {
        let ir = compile("def printf(x: int) -> int:\n    return x\nmalloc: int = 1\nprint(printf(malloc))\n");
        assert!(ir.contains("define i32 @printf.user(i32 %arg.x)"));
        assert!(ir.contains("@malloc.user = global i32 1\n"));
        assert!(ir.contains("declare i32 @printf(ptr, ...)"));
    }

    #[test]
    fn test_print_of_list_is_unsupported() {
        let (interner, program) = parse_program("print([1])\n");
        let hints = type_checker::check(&program).unwrap();
        let err = generate(&program, &hints, &interner, &Options::default()).unwrap_err();
        assert_eq!(err.inner, Error::Unsupported("printing a value of this type"));
        assert_eq!(err.span.to_string(), "6..9");
    }

    #[test]
    fn test_output_is_deterministic() {
        let src = include_str!("../../demos/lists.py");
        assert_eq!(compile(src), compile(src));
    }
}
