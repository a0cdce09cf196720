use crate::{
    ast::Program,
    parser, scope,
    token::Spanned,
    type_checker,
    util::{
        fmt::{tree, Context, Show},
        intern::Interner,
    },
};

/// The last phase a tree test runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Parser,
    Scope,
    Checker,
}

/// Whether the source is a whole program or a lone expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Program,
    Expr,
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// The printed tree (empty if a phase failed) and the rendered errors.
pub struct Outcome {
    pub tree: String,
    pub errors: Vec<String>,
}

impl Outcome {
    fn failed<E>(interner: &Interner, error: &Spanned<E>) -> Outcome
    where
        Spanned<E>: Show,
    {
        Outcome {
            tree: String::new(),
            errors: vec![Context::new(interner).render(error, true)],
        }
    }

    fn tree(tree: String) -> Outcome {
        Outcome {
            tree,
            errors: Vec::new(),
        }
    }

    #[track_caller]
    pub fn check(&self, assertion: &Assertion) {
        use pretty_assertions::assert_eq;

        match *assertion {
            Assertion::TreeOk(expected) => {
                assert_eq!(self.errors, Vec::<String>::new());
                assert_eq!(self.tree.trim(), expected.trim());
            }
            Assertion::TreeError(expected) => assert_eq!(self.tree.trim(), expected.trim()),
            Assertion::ExpectedErrors(expected) => assert_eq!(self.errors, expected),
        }
    }
}

/// Runs every phase up to `phase`, stopping at the first error.
#[track_caller]
pub fn run(phase: Phase, input: Input, src: &'static str) -> Outcome {
    let interner = &mut Interner::with_capacity(128);
    let tokens = &mut Vec::with_capacity(256);

    if input == Input::Expr {
        assert_eq!(phase, Phase::Parser, "only the parser takes lone expressions");
        return match parser::parse_expr(src, tokens, interner) {
            Ok(expr) => Outcome::tree(tree::print_expr_string(interner, &expr, None)),
            Err(error) => Outcome::failed(interner, &error),
        };
    }

    let program = match parser::parse_program(src, tokens, interner) {
        Ok(program) => program,
        Err(error) => return Outcome::failed(interner, &error),
    };
    match phase {
        Phase::Parser => Outcome::tree(tree::print_program_string(interner, &program, None)),
        Phase::Scope => match scope::check(&program) {
            Ok(_) => Outcome::tree(String::new()),
            Err(error) => Outcome::failed(interner, &error),
        },
        Phase::Checker => check(interner, &program),
    }
}

fn check(interner: &Interner, program: &Program) -> Outcome {
    if let Err(error) = scope::check(program) {
        return Outcome::failed(interner, &error);
    }
    match type_checker::check(program) {
        Ok(hints) => Outcome::tree(tree::print_program_string(interner, program, Some(&hints))),
        Err(error) => Outcome::failed(interner, &error),
    }
}

/// Declares a test per `fn`, which runs the phases named by `use` over the
/// source bound by the first `let` and checks the remaining `let`s:
///
/// - `tree_ok`: the dump, and that no error happened;
/// - `tree_error`: the dump only;
/// - `expected_errors`: the rendered errors.
macro_rules! tree_tests {
    (
        use $phase:ident;

        $(
            fn $name:ident() {
                let $input:ident = $src:expr;
                $(let $assertion:ident = $expected:expr;)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $name() {
                let outcome = crate::util::test_utils::run(
                    tree_tests!(@phase $phase),
                    tree_tests!(@input $input),
                    $src,
                );
                $(outcome.check(&tree_tests!(@assertion $assertion, $expected));)*
            }
        )*
    };

    (@phase parser) => { crate::util::test_utils::Phase::Parser };
    (@phase scope) => { crate::util::test_utils::Phase::Scope };
    (@phase checker) => { crate::util::test_utils::Phase::Checker };

    (@input program) => { crate::util::test_utils::Input::Program };
    (@input expr) => { crate::util::test_utils::Input::Expr };

    (@assertion tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@assertion tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@assertion expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };
}
pub(crate) use tree_tests;
