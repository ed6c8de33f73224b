//! Bytecode compiler for the Ember Scripting Language
//!
//! Lowers an [`ast::Program`](crate::ast::Program) to a [`Chunk`]: a flat
//! byte stream of opcodes and operands, a deduplicated constant pool, and a
//! parallel line table. The VM in [`crate::vm`] executes the result
//! directly; nothing is written to disk and no intermediate textual form
//! exists.
//!
//! ## Opcode encoding
//!
//! Every opcode is a single byte. Most operands (constant-pool index, local
//! slot, call argument count, array element count) are a single trailing
//! byte, which caps a chunk at 256 constants and 256 locals — comfortably
//! inside the budget this language targets. Jump operands are the
//! exception: they are 16-bit (`u16`, little-endian), since a jump target
//! is a byte offset into `code` and a chunk may run past 256 bytes. This is
//! why `emit_jump`/`patch_jump` are distinct from the single-byte emit
//! helpers.
//!
//! ## Two-pass compilation
//!
//! [`Compiler::compile`] makes two passes over the top-level statements:
//! the first compiles every function declaration (so forward references
//! between functions work, since each is just a named global), the second
//! emits code for everything else in source order.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinOp, Expression, Program, Statement, UnaryOp};
use crate::vm::Value;

/// Stack-machine opcodes. See the module docs for the operand encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Const,
    True,
    False,

    Load,
    Store,
    LoadGlobal,
    StoreGlobal,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,

    Not,

    Band,
    Bor,
    Bxor,
    Shl,
    Shr,

    Jmp,
    JmpIfFalse,
    JmpIfTrue,

    Call,
    Ret,

    Array,
    Index,
    IndexSet,

    Pop,
    Dup,

    Print,
    Len,
    Push,
    PopArray,
    Time,
    Input,

    Iter,
    IterNext,

    Halt,
}

impl OpCode {
    /// Decodes a raw byte read from a chunk's code stream.
    ///
    /// Returns `None` for any byte the compiler never emits; the VM treats
    /// that as corrupt bytecode rather than a panic, since a `Chunk` is
    /// otherwise an opaque, already-validated artifact.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        const TABLE: &[OpCode] = &[
            Const, True, False, Load, Store, LoadGlobal, StoreGlobal, Add, Sub, Mul, Div, Mod,
            Neg, Eq, Neq, Lt, Gt, Lte, Gte, Not, Band, Bor, Bxor, Shl, Shr, Jmp, JmpIfFalse,
            JmpIfTrue, Call, Ret, Array, Index, IndexSet, Pop, Dup, Print, Len, Push, PopArray,
            Time, Input, Iter, IterNext, Halt,
        ];
        TABLE.get(byte as usize).copied()
    }
}

/// A compiled bytecode chunk: code, constants, and a line table with one
/// entry per emitted byte.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    pub lines: Vec<u32>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a bare opcode with no operand.
    pub fn emit(&mut self, op: OpCode, line: usize) {
        self.code.push(op as u8);
        self.lines.push(line as u32);
    }

    /// Emits an opcode followed by a single-byte operand.
    pub fn emit_u8(&mut self, op: OpCode, arg: u8, line: usize) {
        self.code.push(op as u8);
        self.code.push(arg);
        self.lines.push(line as u32);
        self.lines.push(line as u32);
    }

    /// Emits an opcode followed by a 16-bit little-endian operand whose
    /// value is already known (a backward jump to an already-emitted
    /// offset).
    pub fn emit_u16(&mut self, op: OpCode, arg: u16, line: usize) {
        self.code.push(op as u8);
        let bytes = arg.to_le_bytes();
        self.code.push(bytes[0]);
        self.code.push(bytes[1]);
        self.lines.push(line as u32);
        self.lines.push(line as u32);
        self.lines.push(line as u32);
    }

    /// Emits a jump with a placeholder target and returns the offset of its
    /// operand, to be filled in later by [`Chunk::patch_jump`].
    pub fn emit_jump(&mut self, op: OpCode, line: usize) -> usize {
        self.emit_u16(op, 0, line);
        self.code.len() - 2
    }

    /// Overwrites a previously emitted jump's operand with the current end
    /// of the code stream.
    pub fn patch_jump(&mut self, operand_offset: usize) {
        let target = self.current_offset() as u16;
        let bytes = target.to_le_bytes();
        self.code[operand_offset] = bytes[0];
        self.code[operand_offset + 1] = bytes[1];
    }

    /// Adds a value to the constant pool, reusing an existing entry when
    /// one already matches both the value and its runtime type (so integer
    /// `1` and float `1.0` are always distinct constants).
    pub fn add_constant(&mut self, value: Value) -> u8 {
        for (i, existing) in self.constants.iter().enumerate() {
            if existing.same_type_eq(&value) {
                return i as u8;
            }
        }
        self.constants.push(value);
        (self.constants.len() - 1) as u8
    }

    pub fn current_offset(&self) -> usize {
        self.code.len()
    }
}

/// A compiled function, stored as a constant in the chunk of whichever
/// scope declared it.
///
/// `chunk` is reference-counted rather than owned outright so the VM can
/// switch `current` to it on `CALL` and back to the caller's chunk on `RET`
/// with a cheap pointer clone instead of copying bytecode.
#[derive(Debug)]
pub struct CompiledFunction {
    pub name: String,
    pub arity: usize,
    pub chunk: Rc<Chunk>,
    pub locals_count: usize,
}

/// Lowers a parsed program into a [`Chunk`].
///
/// Each function declaration gets its own `Compiler`, so `locals` never
/// leaks across function boundaries; only the enclosing chunk's constant
/// pool and global table are shared.
pub struct Compiler {
    chunk: Chunk,
    locals: HashMap<String, u8>,
    /// Zero at the top level, non-zero while compiling a function body.
    /// Controls whether `compile_var_decl` allocates a local slot or falls
    /// back to a global store.
    scope_depth: u8,
    functions: HashMap<String, Rc<CompiledFunction>>,
    iter_counter: u32,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            chunk: Chunk::new(),
            locals: HashMap::new(),
            scope_depth: 0,
            functions: HashMap::new(),
            iter_counter: 0,
        }
    }

    fn function_scope() -> Self {
        let mut c = Self::new();
        c.scope_depth = 1;
        c
    }

    /// Compiles a whole program: function declarations first, then the
    /// remaining top-level statements, finally a `HALT`.
    ///
    /// The last non-declaration statement is special-cased (see
    /// `compile_final_stmt`): a bare expression, or an `if` whose taken
    /// branch ends in one, leaves its value on the stack instead of being
    /// popped, so `HALT` (and thus `execute`/`VM::run`) reports it as the
    /// program's result. Every earlier statement keeps the usual
    /// evaluate-then-pop discipline so the stack returns to the same depth
    /// between statements.
    pub fn compile(mut self, program: &Program) -> Chunk {
        for stmt in &program.statements {
            if let Statement::FnDecl { .. } = stmt {
                self.compile_stmt(stmt);
            }
        }

        let rest: Vec<&Statement> = program
            .statements
            .iter()
            .filter(|s| !matches!(s, Statement::FnDecl { .. }))
            .collect();
        let last_index = rest.len().checked_sub(1);
        for (i, stmt) in rest.into_iter().enumerate() {
            if Some(i) == last_index {
                self.compile_final_stmt(stmt);
            } else {
                self.compile_stmt(stmt);
            }
        }

        self.chunk.emit(OpCode::Halt, 0);
        self.chunk
    }

    /// Compiles the program's last statement. Identical to [`Compiler::compile_stmt`]
    /// except a bare expression statement (or an `if` whose taken branch
    /// ends in one) keeps its value on the stack rather than discarding it
    /// with a trailing `Pop`, so it surfaces as the program's result.
    fn compile_final_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::ExprStmt(expr) => self.compile_expr(expr),
            Statement::If {
                condition,
                then_body,
                elif_clauses,
                else_body,
                line,
                ..
            } => self.compile_if(condition, then_body, elif_clauses, else_body, *line, true),
            _ => self.compile_stmt(stmt),
        }
    }

    fn compile_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::VarDecl {
                name, value, line, ..
            } => self.compile_var_decl(name, value, *line),
            Statement::Assignment {
                target,
                value,
                line,
                ..
            } => self.compile_assignment(target, value, *line),
            Statement::If {
                condition,
                then_body,
                elif_clauses,
                else_body,
                line,
                ..
            } => self.compile_if(condition, then_body, elif_clauses, else_body, *line, false),
            Statement::While {
                condition,
                body,
                line,
                ..
            } => self.compile_while(condition, body, *line),
            Statement::For {
                var_name,
                iterable,
                body,
                line,
                ..
            } => self.compile_for(var_name, iterable, body, *line),
            Statement::Return { value, line, .. } => self.compile_return(value.as_ref(), *line),
            Statement::ExprStmt(expr) => {
                self.compile_expr(expr);
                self.chunk.emit(OpCode::Pop, expr.line());
            }
            Statement::FnDecl {
                name,
                params,
                body,
                line,
                ..
            } => self.compile_fn_decl(name, params, body, *line),
        }
    }

    fn compile_var_decl(&mut self, name: &str, value: &Expression, line: usize) {
        self.compile_expr(value);
        if self.scope_depth == 0 {
            let idx = self.chunk.add_constant(Value::Str(Rc::new(name.to_string())));
            self.chunk.emit_u8(OpCode::StoreGlobal, idx, line);
            self.chunk.emit(OpCode::Pop, line);
        } else {
            let slot = self.locals.len() as u8;
            self.locals.insert(name.to_string(), slot);
        }
    }

    fn compile_assignment(&mut self, target: &Expression, value: &Expression, line: usize) {
        self.compile_expr(value);
        match target {
            Expression::Identifier { name, .. } => {
                if let Some(&slot) = self.locals.get(name) {
                    self.chunk.emit_u8(OpCode::Store, slot, line);
                } else {
                    let idx = self
                        .chunk
                        .add_constant(Value::Str(Rc::new(name.clone())));
                    self.chunk.emit_u8(OpCode::StoreGlobal, idx, line);
                }
            }
            Expression::Index { object, index, .. } => {
                self.compile_expr(object);
                self.compile_expr(index);
                self.chunk.emit(OpCode::IndexSet, line);
            }
            _ => unreachable!("parser only produces identifier or index assignment targets"),
        }
        self.chunk.emit(OpCode::Pop, line);
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        then_body: &[Statement],
        elif_clauses: &[(Expression, Vec<Statement>)],
        else_body: &Option<Vec<Statement>>,
        line: usize,
        tail: bool,
    ) {
        self.compile_expr(condition);
        let jump_if_false = self.chunk.emit_jump(OpCode::JmpIfFalse, line);
        self.chunk.emit(OpCode::Pop, line);

        self.compile_body(then_body, tail);

        let mut exit_jumps = Vec::new();
        exit_jumps.push(self.chunk.emit_jump(OpCode::Jmp, line));

        self.chunk.patch_jump(jump_if_false);
        self.chunk.emit(OpCode::Pop, line);

        for (elif_cond, elif_body) in elif_clauses {
            self.compile_expr(elif_cond);
            let jump_if_false = self.chunk.emit_jump(OpCode::JmpIfFalse, line);
            self.chunk.emit(OpCode::Pop, line);

            self.compile_body(elif_body, tail);

            exit_jumps.push(self.chunk.emit_jump(OpCode::Jmp, line));

            self.chunk.patch_jump(jump_if_false);
            self.chunk.emit(OpCode::Pop, line);
        }

        if let Some(body) = else_body {
            self.compile_body(body, tail);
        }

        for offset in exit_jumps {
            self.chunk.patch_jump(offset);
        }
    }

    /// Compiles a statement list. In tail position, the final statement is
    /// compiled via [`Compiler::compile_final_stmt`] so a trailing bare
    /// expression (or nested `if`) leaves its value on the stack instead of
    /// being popped.
    fn compile_body(&mut self, body: &[Statement], tail: bool) {
        if tail {
            if let Some((last, rest)) = body.split_last() {
                for s in rest {
                    self.compile_stmt(s);
                }
                self.compile_final_stmt(last);
            }
        } else {
            for s in body {
                self.compile_stmt(s);
            }
        }
    }

    fn compile_while(&mut self, condition: &Expression, body: &[Statement], line: usize) {
        let loop_start = self.chunk.current_offset();

        self.compile_expr(condition);
        let exit_jump = self.chunk.emit_jump(OpCode::JmpIfFalse, line);
        self.chunk.emit(OpCode::Pop, line);

        for s in body {
            self.compile_stmt(s);
        }

        self.chunk
            .emit_u16(OpCode::Jmp, loop_start as u16, line);

        self.chunk.patch_jump(exit_jump);
        self.chunk.emit(OpCode::Pop, line);
    }

    /// Lowers a `for` loop through a synthetic global iterator slot.
    ///
    /// `LOAD_GLOBAL` for the iterator runs exactly once, before the loop:
    /// `ITER_NEXT` never pops on its continue path, so the same iterator
    /// stays on the stack across every pass and the back-edge jumps to
    /// `ITER_NEXT` directly rather than reloading it. Reloading the global
    /// on every iteration would push a second copy of the iterator each
    /// time around — `ITER_NEXT` only ever pops the copy closest to TOS, so
    /// the older copies would never be cleaned up and the loop would leak
    /// one stack slot per iteration.
    fn compile_for(&mut self, var_name: &str, iterable: &Expression, body: &[Statement], line: usize) {
        self.compile_expr(iterable);
        self.chunk.emit(OpCode::Iter, line);

        self.iter_counter += 1;
        let iter_name = format!("__iter_{}", self.iter_counter);
        let iter_idx = self.chunk.add_constant(Value::Str(Rc::new(iter_name)));
        self.chunk.emit_u8(OpCode::StoreGlobal, iter_idx, line);
        self.chunk.emit(OpCode::Pop, line);

        let var_idx = self
            .chunk
            .add_constant(Value::Str(Rc::new(var_name.to_string())));

        self.chunk.emit_u8(OpCode::LoadGlobal, iter_idx, line);
        let loop_start = self.chunk.current_offset();
        let exit_jump = self.chunk.emit_jump(OpCode::IterNext, line);

        self.chunk.emit_u8(OpCode::StoreGlobal, var_idx, line);
        self.chunk.emit(OpCode::Pop, line);

        for s in body {
            self.compile_stmt(s);
        }

        self.chunk
            .emit_u16(OpCode::Jmp, loop_start as u16, line);

        self.chunk.patch_jump(exit_jump);
    }

    fn compile_return(&mut self, value: Option<&Expression>, line: usize) {
        match value {
            Some(expr) => self.compile_expr(expr),
            None => {
                let idx = self.chunk.add_constant(Value::Null);
                self.chunk.emit_u8(OpCode::Const, idx, line);
            }
        }
        self.chunk.emit(OpCode::Ret, line);
    }

    fn compile_fn_decl(
        &mut self,
        name: &str,
        params: &[crate::ast::Param],
        body: &[Statement],
        line: usize,
    ) {
        let mut fn_compiler = Self::function_scope();
        for (i, param) in params.iter().enumerate() {
            fn_compiler.locals.insert(param.name.clone(), i as u8);
        }

        for s in body {
            fn_compiler.compile_stmt(s);
        }

        let null_idx = fn_compiler.chunk.add_constant(Value::Null);
        fn_compiler.chunk.emit_u8(OpCode::Const, null_idx, line);
        fn_compiler.chunk.emit(OpCode::Ret, line);

        let compiled = Rc::new(CompiledFunction {
            name: name.to_string(),
            arity: params.len(),
            chunk: Rc::new(fn_compiler.chunk),
            locals_count: fn_compiler.locals.len(),
        });

        self.functions.insert(name.to_string(), compiled.clone());

        let fn_idx = self.chunk.add_constant(Value::Fn(compiled));
        let name_idx = self.chunk.add_constant(Value::Str(Rc::new(name.to_string())));
        self.chunk.emit_u8(OpCode::Const, fn_idx, line);
        self.chunk.emit_u8(OpCode::StoreGlobal, name_idx, line);
        self.chunk.emit(OpCode::Pop, line);
    }

    fn compile_expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Int { value, line, .. } => {
                let idx = self.chunk.add_constant(Value::Int(*value));
                self.chunk.emit_u8(OpCode::Const, idx, *line);
            }
            Expression::Float { value, line, .. } => {
                let idx = self.chunk.add_constant(Value::Float(*value));
                self.chunk.emit_u8(OpCode::Const, idx, *line);
            }
            Expression::Str { value, line, .. } => {
                let idx = self
                    .chunk
                    .add_constant(Value::Str(Rc::new(value.clone())));
                self.chunk.emit_u8(OpCode::Const, idx, *line);
            }
            Expression::Bool { value, line, .. } => {
                self.chunk.emit(if *value { OpCode::True } else { OpCode::False }, *line);
            }
            Expression::Identifier { name, line, .. } => {
                if let Some(&slot) = self.locals.get(name) {
                    self.chunk.emit_u8(OpCode::Load, slot, *line);
                } else {
                    let idx = self
                        .chunk
                        .add_constant(Value::Str(Rc::new(name.clone())));
                    self.chunk.emit_u8(OpCode::LoadGlobal, idx, *line);
                }
            }
            Expression::Binary { .. } => self.compile_binary(expr),
            Expression::Unary { op, operand, line, .. } => {
                self.compile_expr(operand);
                match op {
                    UnaryOp::Neg => self.chunk.emit(OpCode::Neg, *line),
                    UnaryOp::Not => self.chunk.emit(OpCode::Not, *line),
                }
            }
            Expression::Call { .. } => self.compile_call(expr),
            Expression::Index { object, index, line, .. } => {
                self.compile_expr(object);
                self.compile_expr(index);
                self.chunk.emit(OpCode::Index, *line);
            }
            Expression::Array { elements, line, .. } => {
                for elem in elements {
                    self.compile_expr(elem);
                }
                self.chunk.emit_u8(OpCode::Array, elements.len() as u8, *line);
            }
            Expression::Range { start, end, line, .. } => {
                let idx = self
                    .chunk
                    .add_constant(Value::Str(Rc::new("__range__".to_string())));
                self.chunk.emit_u8(OpCode::LoadGlobal, idx, *line);
                self.compile_expr(start);
                self.compile_expr(end);
                self.chunk.emit_u8(OpCode::Call, 2, *line);
            }
        }
    }

    fn compile_binary(&mut self, expr: &Expression) {
        let (op, left, right, line) = match expr {
            Expression::Binary { op, left, right, line, .. } => (*op, left, right, *line),
            _ => unreachable!(),
        };

        if op == BinOp::And {
            self.compile_expr(left);
            let jump = self.chunk.emit_jump(OpCode::JmpIfFalse, line);
            self.chunk.emit(OpCode::Pop, line);
            self.compile_expr(right);
            self.chunk.patch_jump(jump);
            return;
        }

        if op == BinOp::Or {
            self.compile_expr(left);
            let jump = self.chunk.emit_jump(OpCode::JmpIfTrue, line);
            self.chunk.emit(OpCode::Pop, line);
            self.compile_expr(right);
            self.chunk.patch_jump(jump);
            return;
        }

        self.compile_expr(left);
        self.compile_expr(right);

        let opcode = match op {
            BinOp::Add => OpCode::Add,
            BinOp::Sub => OpCode::Sub,
            BinOp::Mul => OpCode::Mul,
            BinOp::Div => OpCode::Div,
            BinOp::Mod => OpCode::Mod,
            BinOp::Eq => OpCode::Eq,
            BinOp::NotEq => OpCode::Neq,
            BinOp::Lt => OpCode::Lt,
            BinOp::Gt => OpCode::Gt,
            BinOp::Lte => OpCode::Lte,
            BinOp::Gte => OpCode::Gte,
            BinOp::BAnd => OpCode::Band,
            BinOp::BOr => OpCode::Bor,
            BinOp::BXor => OpCode::Bxor,
            BinOp::Shl => OpCode::Shl,
            BinOp::Shr => OpCode::Shr,
            BinOp::And | BinOp::Or => unreachable!("short-circuit ops handled above"),
        };
        self.chunk.emit(opcode, line);
    }

    /// Recognizes the handful of built-ins that lower to dedicated opcodes
    /// instead of a generic `CALL`. Anything else — including every
    /// standard-library function — falls through to the generic path and is
    /// resolved dynamically through the globals table at call time.
    fn compile_call(&mut self, expr: &Expression) {
        let (callee, args, line) = match expr {
            Expression::Call { callee, args, line, .. } => (callee.as_ref(), args, *line),
            _ => unreachable!(),
        };

        if let Expression::Identifier { name, .. } = callee {
            match name.as_str() {
                "print" => {
                    for arg in args {
                        self.compile_expr(arg);
                        self.chunk.emit(OpCode::Print, line);
                    }
                    let idx = self.chunk.add_constant(Value::Null);
                    self.chunk.emit_u8(OpCode::Const, idx, line);
                    return;
                }
                "len" => {
                    self.compile_expr(&args[0]);
                    self.chunk.emit(OpCode::Len, line);
                    return;
                }
                "push" => {
                    self.compile_expr(&args[0]);
                    self.compile_expr(&args[1]);
                    self.chunk.emit(OpCode::Push, line);
                    return;
                }
                "pop" => {
                    self.compile_expr(&args[0]);
                    self.chunk.emit(OpCode::PopArray, line);
                    return;
                }
                "time" => {
                    self.chunk.emit(OpCode::Time, line);
                    return;
                }
                "input" => {
                    self.chunk.emit(OpCode::Input, line);
                    return;
                }
                _ => {}
            }
        }

        self.compile_expr(callee);
        for arg in args {
            self.compile_expr(arg);
        }
        self.chunk.emit_u8(OpCode::Call, args.len() as u8, line);
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles source text end to end: lex, parse, compile.
pub fn compile_program(source: &str) -> crate::error::Result<Chunk> {
    let tokens = crate::lexer::tokenize(source)?;
    let program = crate::parser::parse(tokens)?;
    let chunk = Compiler::new().compile(&program);
    log::debug!(
        "compiled chunk: {} bytes, {} constants",
        chunk.code.len(),
        chunk.constants.len()
    );
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile_source(src: &str) -> Chunk {
        let tokens = tokenize(src).expect("lex");
        let program = parse(tokens).expect("parse");
        Compiler::new().compile(&program)
    }

    #[test]
    fn constant_pool_dedups_by_value_and_type() {
        let chunk = compile_source("let a = 1\nlet b = 1\nlet c = 1.0\n");
        let ints: Vec<_> = chunk
            .constants
            .iter()
            .filter(|v| matches!(v, Value::Int(1)))
            .collect();
        let floats: Vec<_> = chunk
            .constants
            .iter()
            .filter(|v| matches!(v, Value::Float(f) if *f == 1.0))
            .collect();
        assert_eq!(ints.len(), 1);
        assert_eq!(floats.len(), 1);
    }

    #[test]
    fn global_var_decl_stores_then_pops() {
        let chunk = compile_source("let x = 5\n");
        assert_eq!(OpCode::from_u8(chunk.code[0]), Some(OpCode::Const));
        assert_eq!(OpCode::from_u8(chunk.code[2]), Some(OpCode::StoreGlobal));
        assert_eq!(OpCode::from_u8(chunk.code[4]), Some(OpCode::Pop));
    }

    #[test]
    fn if_without_else_patches_both_jumps_past_halt() {
        let chunk = compile_source("if true then\n  let x = 1\nend\n");
        // every jump operand must point at a byte within [0, code.len()]
        let mut i = 0;
        while i < chunk.code.len() {
            let op = OpCode::from_u8(chunk.code[i]).unwrap();
            match op {
                OpCode::JmpIfFalse | OpCode::Jmp | OpCode::JmpIfTrue | OpCode::IterNext => {
                    let target = u16::from_le_bytes([chunk.code[i + 1], chunk.code[i + 2]]);
                    assert!((target as usize) <= chunk.code.len());
                    i += 3;
                }
                OpCode::Const
                | OpCode::Load
                | OpCode::Store
                | OpCode::LoadGlobal
                | OpCode::StoreGlobal
                | OpCode::Call
                | OpCode::Array => i += 2,
                _ => i += 1,
            }
        }
    }

    #[test]
    fn for_loop_uses_synthetic_iterator_global() {
        let chunk = compile_source("for i in 1..3 do\n  print(i)\nend\n");
        let has_iter_name = chunk.constants.iter().any(|c| match c {
            Value::Str(s) => s.starts_with("__iter_"),
            _ => false,
        });
        assert!(has_iter_name);
    }

    #[test]
    fn function_params_become_local_slots() {
        let chunk = compile_source("fn add(a: int, b: int) -> int\n  return a + b\nend\n");
        let f = chunk
            .constants
            .iter()
            .find_map(|c| match c {
                Value::Fn(f) => Some(f.clone()),
                _ => None,
            })
            .expect("compiled function constant");
        assert_eq!(f.arity, 2);
        // body should LOAD slot 0 and slot 1, never LOAD_GLOBAL
        assert!(!f
            .chunk
            .code
            .iter()
            .enumerate()
            .any(|(i, &b)| OpCode::from_u8(b) == Some(OpCode::LoadGlobal) && i == 0));
    }

    #[test]
    fn print_call_lowers_to_dedicated_opcode_not_call() {
        let chunk = compile_source("print(1)\n");
        assert!(chunk
            .code
            .iter()
            .any(|&b| OpCode::from_u8(b) == Some(OpCode::Print)));
        assert!(!chunk
            .code
            .iter()
            .any(|&b| OpCode::from_u8(b) == Some(OpCode::Call)));
    }

    #[test]
    fn short_circuit_and_emits_jump_if_false() {
        let chunk = compile_source("let x = 1 and 2\n");
        assert!(chunk
            .code
            .iter()
            .any(|&b| OpCode::from_u8(b) == Some(OpCode::JmpIfFalse)));
    }
}
