/// The lexer takes the source input, mapping it into a sequence of tokens,
/// including the synthetic indentation ones.
pub mod lexer;

/// The scanner walks the source one character at a time.
pub(crate) mod scanner;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The scope analysis checks that every name resolves, building the tree of
/// scopes of a program.
pub mod scope;

/// The type checker checks the soundness of the types of an AST, producing a
/// hint for each expression.
pub mod type_checker;

/// The code generator lowers a checked AST into LLVM IR text.
pub mod codegen;

pub mod pipeline;

pub mod ast;
pub mod token;
pub mod types;
pub mod visit;

pub mod util {
    pub mod fmt;
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
