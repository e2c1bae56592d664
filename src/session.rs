//! Pipeline driver: scan → parse → resolve → tree walker and/or bytecode VM.
//!
//! One `Session` lives for a whole REPL run, so globals defined by one line
//! stay visible to the next.

use std::io::{self, Write};

use clap::ValueEnum;
use log::{debug, info};

use crate::ast::Stmt;
use crate::ast_printer::AstPrinter;
use crate::chunk::Chunk;
use crate::codegen::{ChunkEmitter, CodeGenerator};
use crate::error::{LhoxError, Phase, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;
use crate::vm::{InterpretResult, Vm};

/// Which execution path(s) run a program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Tree-walking interpreter (full language).
    #[default]
    Tree,
    /// Bytecode compiler + VM (straight-line subset).
    Vm,
    /// Tree walker first, then the VM.
    Both,
}

impl Backend {
    fn runs_tree(self) -> bool {
        matches!(self, Backend::Tree | Backend::Both)
    }

    fn runs_vm(self) -> bool {
        matches!(self, Backend::Vm | Backend::Both)
    }
}

/// Debug dumps written before execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    pub tokens: bool,
    pub ast: bool,
    pub disassemble: bool,
}

pub struct Session {
    backend: Backend,
    dumps: DumpOptions,
    interpreter: Interpreter,
    vm: Vm,
    chunk: Chunk,
    out: Box<dyn Write>,
}

impl Session {
    /// Session writing everything to stdout.
    pub fn new(backend: Backend) -> Self {
        Self::from_parts(
            backend,
            Interpreter::new(),
            Vm::new(),
            Box::new(io::stdout()),
        )
    }

    /// Session whose interpreter, VM and dumps all write to clones of `out`.
    pub fn with_output<W: Write + Clone + 'static>(backend: Backend, out: W) -> Self {
        Self::from_parts(
            backend,
            Interpreter::with_output(Box::new(out.clone())),
            Vm::with_output(Box::new(out.clone())),
            Box::new(out),
        )
    }

    pub fn from_parts(backend: Backend, interpreter: Interpreter, vm: Vm, out: Box<dyn Write>) -> Self {
        info!("Session created with backend {:?}", backend);

        Self {
            backend,
            dumps: DumpOptions::default(),
            interpreter,
            vm,
            chunk: Chunk::new(),
            out,
        }
    }

    pub fn set_dumps(&mut self, dumps: DumpOptions) {
        self.dumps = dumps;
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// The chunk compiled by the most recent VM run.
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// Runs one program (a file, or one REPL line).
    ///
    /// Scan and parse errors are returned as a batch; resolution and
    /// execution stop at the first error.
    pub fn run(&mut self, source: &str) -> Result<()> {
        let tokens: Vec<Token> = self.scan(source)?;
        let statements: Vec<Stmt> = self.parse(tokens)?;

        Resolver::new(&mut self.interpreter).resolve(&statements)?;

        if self.backend.runs_tree() {
            self.interpreter.interpret(&statements)?;
        }

        if self.backend.runs_vm() {
            self.compile(&statements)?;
            self.execute_chunk()?;
        }

        Ok(())
    }

    fn scan(&mut self, source: &str) -> Result<Vec<Token>> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();

        if !errors.is_empty() {
            return Err(LhoxError::batch(Phase::Scan, errors));
        }

        debug!("Scanned {} token(s)", tokens.len());

        if self.dumps.tokens {
            writeln!(self.out, "{}", serde_json::to_string_pretty(&tokens)?)?;
        }

        Ok(tokens)
    }

    fn parse(&mut self, tokens: Vec<Token>) -> Result<Vec<Stmt>> {
        let (statements, errors) = Parser::new(tokens).parse();

        if !errors.is_empty() {
            return Err(LhoxError::batch(Phase::Parse, errors));
        }

        if self.dumps.ast {
            for stmt in &statements {
                writeln!(self.out, "{}", AstPrinter::print_stmt(stmt))?;
            }
        }

        Ok(statements)
    }

    fn compile(&mut self, statements: &[Stmt]) -> Result<()> {
        self.chunk.clear();

        CodeGenerator::new(ChunkEmitter::new(&mut self.chunk)).generate(statements)?;

        if self.dumps.disassemble {
            for line in self.chunk.disassemble() {
                writeln!(self.out, "{}", line)?;
            }
        }

        Ok(())
    }

    fn execute_chunk(&mut self) -> Result<()> {
        match self.vm.interpret(&self.chunk) {
            InterpretResult::Ok => Ok(()),
            InterpretResult::CompileError => Err(LhoxError::compile(
                self.vm.last_error().unwrap_or("bytecode compile error"),
            )),
            InterpretResult::RuntimeError => Err(LhoxError::runtime(
                self.vm.last_error().unwrap_or("bytecode runtime error"),
            )),
        }
    }
}
