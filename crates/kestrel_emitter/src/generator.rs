//! The tree-walking code generator.
//!
//! Lowers an analyzed tree to MIPS assembly text. Expressions evaluate into
//! temporaries from a fixed pool, locals live in `$fp`-relative stack slots,
//! and structured control flow becomes labeled jumps.
//!
//! Stack discipline: outside of a call sequence `$sp == $fp - depth`, where
//! `depth` is the bytes of locals currently in scope. Every path out of a
//! block (falling off the end, `break`, `exit`) restores that invariant for
//! the construct it lands in.

use crate::asm::{escape_asciiz, instr, AsmBuffer, Label, LabelAllocator};
use crate::error::{CodegenError, CodegenResult};
use crate::frame::{FrameLayout, Slot, SlotKind, WORD};
use crate::registers::{Reg, RegisterPool, MAX_TEMP_REGISTERS};
use kestrel_ast::{Node, NodeKind, Operator};
use kestrel_binder::{SymbolKind, SymbolTable};
use kestrel_core::FxMap;

/// Data label of the newline string printed after every value.
pub const NEWLINE_LABEL: &str = "_newline";
/// Data label of the integer print format.
pub const INT_FORMAT_LABEL: &str = "_int_fmt";
/// Prefix of function entry labels.
pub const FUNCTION_PREFIX: &str = "func_";

/// Bytes of saved `$ra` and `$fp` at the top of every frame.
const LINKAGE_BYTES: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Size of the temporary register pool.
    pub temp_registers: usize,
    /// Annotate the output with `#` comments.
    pub emit_comments: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            temp_registers: MAX_TEMP_REGISTERS,
            emit_comments: true,
        }
    }
}

/// Which body is being lowered; decides what `return` becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecContext {
    Main,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    CountingLoop,
    IndefiniteLoop,
    Switch,
}

/// An enclosing construct that `break` or `exit` can jump out of.
#[derive(Debug, Clone)]
struct JumpTarget {
    kind: TargetKind,
    exit: Label,
    /// Frame depth in effect at `exit`.
    depth: u32,
}

/// Where a named value is stored.
#[derive(Debug, Clone)]
enum Location {
    Frame(Slot),
    /// A `.data` label; `array_words` is set for arrays.
    Global { name: String, array_words: Option<u32> },
}

impl Location {
    /// Words of an array stored in place. `None` for scalars and references.
    fn array_words(&self) -> Option<u32> {
        match self {
            Location::Frame(slot) => (slot.kind == SlotKind::Array).then_some(slot.words),
            Location::Global { array_words, .. } => *array_words,
        }
    }

    fn is_array(&self) -> bool {
        match self {
            Location::Frame(slot) => slot.kind != SlotKind::Scalar,
            Location::Global { array_words, .. } => array_words.is_some(),
        }
    }
}

/// Generate assembly for an analyzed program.
pub fn generate(program: &Node, symbols: &SymbolTable, options: GeneratorOptions) -> CodegenResult<String> {
    CodeGenerator::new(symbols, options).generate(program)
}

/// One code generation run. Reads the global scope of the analyzer's symbol
/// table for global storage; everything else comes from the tree.
pub struct CodeGenerator<'a> {
    symbols: &'a SymbolTable,
    pool: RegisterPool,
    labels: LabelAllocator,
    text: AsmBuffer,
    emit_comments: bool,
    /// String literals in first-use order, with their data labels.
    strings: Vec<(Label, String)>,
    string_labels: FxMap<String, Label>,
    frame: FrameLayout,
    targets: Vec<JumpTarget>,
    /// The single program epilogue every return from main jumps to.
    main_exit: Label,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(symbols: &'a SymbolTable, options: GeneratorOptions) -> Self {
        let mut labels = LabelAllocator::new();
        let main_exit = labels.fresh("exit");
        Self {
            symbols,
            pool: RegisterPool::new(options.temp_registers),
            labels,
            text: AsmBuffer::new(options.emit_comments),
            emit_comments: options.emit_comments,
            strings: Vec::new(),
            string_labels: FxMap::default(),
            frame: FrameLayout::new(),
            targets: Vec::new(),
            main_exit,
        }
    }

    pub fn generate(mut self, program: &Node) -> CodegenResult<String> {
        if program.kind != NodeKind::Program {
            return Err(CodegenError::malformed(program.kind, "expected a Program root"));
        }
        let sections = ProgramSections::split(program)?;

        self.text.line(format_args!(".text"));
        self.text.line(format_args!(".globl main"));
        self.text.label(&Label::named("main"));
        self.emit_prologue();

        if !sections.globals.is_empty() {
            self.text.comment("global initializers");
        }
        for decl in &sections.globals {
            self.lower_global_init(decl)?;
        }

        if let Some(main) = sections.main {
            let body = match main.children.as_slice() {
                [body] if body.kind == NodeKind::Block => body,
                _ => return Err(CodegenError::malformed(NodeKind::Main, "expected a single Block body")),
            };
            self.frame = FrameLayout::new();
            self.lower_block(body, ExecContext::Main)?;
        }

        let exit = self.main_exit.clone();
        self.text.label(&exit);
        self.emit_frame_teardown();
        instr!(self.text, "li $v0, 10");
        instr!(self.text, "syscall");

        for function in &sections.functions {
            self.lower_function(function)?;
        }

        let mut out = self.emit_data()?;
        out.push('\n');
        out.push_str(&self.text.finish());
        Ok(out)
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn emit_data(&self) -> CodegenResult<String> {
        let mut data = AsmBuffer::new(self.emit_comments);
        data.line(format_args!(".data"));
        for symbol in self.symbols.global_scope().symbols() {
            if symbol.kind != SymbolKind::Variable {
                continue;
            }
            if symbol.is_array() {
                let words = symbol
                    .word_count()
                    .ok_or_else(|| CodegenError::StorageOverflow(symbol.name.clone()))?;
                data.line(format_args!("{}: .space {}", symbol.name, words * WORD));
            } else {
                data.line(format_args!("{}: .word 0", symbol.name));
            }
        }
        data.line(format_args!("{}: .asciiz \"\\n\"", NEWLINE_LABEL));
        data.line(format_args!("{}: .asciiz \"%d\"", INT_FORMAT_LABEL));
        for (label, text) in &self.strings {
            data.line(format_args!("{}: .asciiz \"{}\"", label, escape_asciiz(text)));
        }
        Ok(data.finish())
    }

    fn emit_prologue(&mut self) {
        instr!(self.text, "addi $sp, $sp, -{}", LINKAGE_BYTES);
        instr!(self.text, "sw $ra, 4($sp)");
        instr!(self.text, "sw $fp, 0($sp)");
        instr!(self.text, "move $fp, $sp");
    }

    fn emit_frame_teardown(&mut self) {
        instr!(self.text, "move $sp, $fp");
        instr!(self.text, "lw $fp, 0($sp)");
        instr!(self.text, "lw $ra, 4($sp)");
        instr!(self.text, "addi $sp, $sp, {}", LINKAGE_BYTES);
    }

    fn emit_function_return(&mut self) {
        self.emit_frame_teardown();
        instr!(self.text, "jr $ra");
    }

    fn lower_global_init(&mut self, decl: &Node) -> CodegenResult<()> {
        if decl.kind != NodeKind::GlobalDecl {
            return Err(CodegenError::malformed(decl.kind, "expected GlobalDecl"));
        }
        let (_, init) = decl
            .declaration_parts()
            .ok_or_else(|| CodegenError::malformed(decl.kind, "expected a Type and an optional initializer"))?;
        if let Some(init) = init {
            let location = self.locate(decl.text())?;
            self.assign(&location, init)?;
        }
        Ok(())
    }

    /// Emit a function after the program epilogue. Arguments were pushed left
    /// to right by the caller, so the last one sits just above the linkage.
    /// An array argument is the address of the caller's first element.
    fn lower_function(&mut self, function: &Node) -> CodegenResult<()> {
        if function.kind != NodeKind::Function {
            return Err(CodegenError::malformed(function.kind, "expected Function"));
        }
        let parts = function.function_parts().ok_or_else(|| {
            CodegenError::malformed(NodeKind::Function, "expected a return Type, optional Params and a Block body")
        })?;
        let name = function.text();

        self.text.line(format_args!(""));
        self.text.label(&Label::named(format!("{}{}", FUNCTION_PREFIX, name)));
        self.text.comment(&format!("function {}", name));
        self.emit_prologue();

        self.frame = FrameLayout::new();
        let count = parts.params.len() as i32;
        for (i, param) in parts.params.iter().enumerate() {
            let offset = LINKAGE_BYTES + (count - 1 - i as i32) * WORD as i32;
            let kind = match param.nth(0).filter(|t| t.kind == NodeKind::Type).and_then(Node::type_spec) {
                Some(spec) if spec.ty.is_array() => SlotKind::Reference,
                _ => SlotKind::Scalar,
            };
            self.frame.bind_param(param.text(), kind, offset);
        }

        let statements = parts.body.statements();
        self.lower_block(parts.body, ExecContext::Function)?;
        if !ends_in_jump(&statements) {
            self.emit_function_return();
        }
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn lower_block(&mut self, block: &Node, ctx: ExecContext) -> CodegenResult<()> {
        self.frame.push_block();
        let statements = block.statements();
        for stmt in &statements {
            self.lower_statement(stmt, ctx)?;
        }
        if ends_in_jump(&statements) {
            // The jump already reset `$sp` for its target.
            self.frame.pop_block();
        } else {
            self.close_block();
        }
        Ok(())
    }

    /// Close the innermost frame block and give its bytes back to the stack.
    fn close_block(&mut self) {
        let bytes = self.frame.pop_block();
        if bytes > 0 {
            self.text.comment("release block locals");
            instr!(self.text, "addi $sp, $sp, {}", bytes);
        }
    }

    fn lower_statement(&mut self, stmt: &Node, ctx: ExecContext) -> CodegenResult<()> {
        match stmt.kind {
            NodeKind::LocalDecl => self.lower_local_decl(stmt),
            NodeKind::Assignment => {
                let [value] = stmt.children.as_slice() else {
                    return Err(CodegenError::malformed(stmt.kind, "expected exactly one value"));
                };
                let location = self.locate(stmt.text())?;
                self.assign(&location, value)
            }
            NodeKind::ArrayAssignment => self.lower_array_store(stmt),
            NodeKind::Block => self.lower_block(stmt, ctx),
            NodeKind::StatementList => {
                for s in stmt.statements() {
                    self.lower_statement(s, ctx)?;
                }
                Ok(())
            }
            NodeKind::Switch => self.lower_switch(stmt, ctx),
            NodeKind::IndefiniteLoop => self.lower_indefinite_loop(stmt, ctx),
            NodeKind::Exit => self.lower_exit(stmt),
            NodeKind::CountingLoop => self.lower_counting_loop(stmt, ctx),
            NodeKind::Return => self.lower_return(stmt, ctx),
            NodeKind::Break => {
                let target = self
                    .targets
                    .last()
                    .cloned()
                    .ok_or(CodegenError::NoJumpTarget("break"))?;
                self.restore_depth(target.depth);
                instr!(self.text, "j {}", target.exit);
                Ok(())
            }
            // `++x` / `--x` on their own are assignments, not printed.
            NodeKind::Operation if is_step(stmt) => self.discard(stmt),
            NodeKind::StringLiteral => {
                let label = self.string_label(stmt.string_value());
                self.text.comment("print string");
                instr!(self.text, "la $a0, {}", label);
                instr!(self.text, "li $v0, 4");
                instr!(self.text, "syscall");
                self.emit_print_newline();
                Ok(())
            }
            kind if kind.is_expression() => self.lower_print(stmt),
            kind => Err(CodegenError::malformed(kind, "not valid in statement position")),
        }
    }

    /// An expression statement prints its value followed by a newline.
    fn lower_print(&mut self, expr: &Node) -> CodegenResult<()> {
        let reg = self.eval(expr)?;
        self.text.comment("print value");
        instr!(self.text, "move $a0, {}", reg);
        instr!(self.text, "li $v0, 1");
        instr!(self.text, "syscall");
        self.emit_print_newline();
        self.pool.free(reg);
        Ok(())
    }

    fn emit_print_newline(&mut self) {
        instr!(self.text, "la $a0, {}", NEWLINE_LABEL);
        instr!(self.text, "li $v0, 4");
        instr!(self.text, "syscall");
    }

    /// Evaluate for side effects only.
    fn discard(&mut self, expr: &Node) -> CodegenResult<()> {
        let reg = self.eval(expr)?;
        self.pool.free(reg);
        Ok(())
    }

    fn lower_local_decl(&mut self, decl: &Node) -> CodegenResult<()> {
        let (type_node, init) = decl
            .declaration_parts()
            .ok_or_else(|| CodegenError::malformed(decl.kind, "expected a Type and an optional initializer"))?;
        let name = decl.text();
        let overflow = || CodegenError::StorageOverflow(name.to_string());
        let (kind, words) = match type_node.type_spec() {
            Some(spec) if spec.ty.is_array() => (SlotKind::Array, spec.word_count().ok_or_else(overflow)?),
            _ => (SlotKind::Scalar, 1),
        };

        // The initializer is evaluated before the name is bound.
        let source_words = init.and_then(|init| self.known_array_words(init));
        let value = init.map(|init| self.eval(init)).transpose()?;
        let slot = self.frame.declare(name, kind, words).ok_or_else(overflow)?;
        self.text.comment(&format!("local {} at {}($fp)", name, slot.offset));
        instr!(self.text, "addi $sp, $sp, -{}", slot.bytes());
        if let Some(reg) = value {
            self.store_value(&Location::Frame(slot), reg, source_words)?;
        }
        Ok(())
    }

    fn lower_array_store(&mut self, stmt: &Node) -> CodegenResult<()> {
        let [index, value] = stmt.children.as_slice() else {
            return Err(CodegenError::malformed(stmt.kind, "expected an index and a value"));
        };
        let location = self.locate(stmt.text())?;
        let index = self.eval(index)?;
        let value = self.eval(value)?;
        let operand = self.element_operand(index, &location)?;
        instr!(self.text, "sw {}, {}", value, operand);
        self.pool.free(value);
        self.pool.free(index);
        Ok(())
    }

    fn lower_switch(&mut self, stmt: &Node, ctx: ExecContext) -> CodegenResult<()> {
        let (cases, otherwise) = stmt
            .switch_parts()
            .ok_or_else(|| CodegenError::malformed(stmt.kind, "expected Cases and an optional Else"))?;
        let end = self.labels.fresh("end");
        self.targets.push(JumpTarget {
            kind: TargetKind::Switch,
            exit: end.clone(),
            depth: self.frame.depth(),
        });

        for case in &cases.children {
            let (NodeKind::Case, [guard, body]) = (case.kind, case.children.as_slice()) else {
                return Err(CodegenError::malformed(case.kind, "expected a Case with a guard and a body"));
            };
            let next = self.labels.fresh("next");
            let reg = self.eval(guard)?;
            instr!(self.text, "beq {}, $zero, {}", reg, next);
            self.pool.free(reg);
            self.lower_branch_body(case, body, ctx)?;
            instr!(self.text, "j {}", end);
            self.text.label(&next);
        }
        if let Some(otherwise) = otherwise {
            let [body] = otherwise.children.as_slice() else {
                return Err(CodegenError::malformed(otherwise.kind, "expected a single body"));
            };
            self.lower_branch_body(otherwise, body, ctx)?;
        }

        self.targets.pop();
        self.text.label(&end);
        Ok(())
    }

    fn lower_branch_body(&mut self, branch: &Node, body: &Node, ctx: ExecContext) -> CodegenResult<()> {
        if body.kind != NodeKind::Block {
            return Err(CodegenError::malformed(branch.kind, "expected a Block body"));
        }
        self.lower_block(body, ctx)
    }

    fn lower_indefinite_loop(&mut self, stmt: &Node, ctx: ExecContext) -> CodegenResult<()> {
        let top = self.labels.fresh("top");
        let bottom = self.labels.fresh("bottom");
        self.targets.push(JumpTarget {
            kind: TargetKind::IndefiniteLoop,
            exit: bottom.clone(),
            depth: self.frame.depth(),
        });

        self.text.label(&top);
        self.lower_block(stmt, ctx)?;
        instr!(self.text, "j {}", top);

        self.targets.pop();
        self.text.label(&bottom);
        Ok(())
    }

    /// Leave the nearest indefinite loop when the condition holds.
    fn lower_exit(&mut self, stmt: &Node) -> CodegenResult<()> {
        let [condition] = stmt.children.as_slice() else {
            return Err(CodegenError::malformed(stmt.kind, "expected a single condition"));
        };
        let target = self
            .targets
            .iter()
            .rev()
            .find(|t| t.kind == TargetKind::IndefiniteLoop)
            .cloned()
            .ok_or(CodegenError::NoJumpTarget("exit"))?;

        let reg = self.eval(condition)?;
        if self.frame.depth() == target.depth {
            instr!(self.text, "bne {}, $zero, {}", reg, target.exit);
        } else {
            let stay = self.labels.fresh("stay");
            instr!(self.text, "beq {}, $zero, {}", reg, stay);
            self.restore_depth(target.depth);
            instr!(self.text, "j {}", target.exit);
            self.text.label(&stay);
        }
        self.pool.free(reg);
        Ok(())
    }

    fn lower_counting_loop(&mut self, stmt: &Node, ctx: ExecContext) -> CodegenResult<()> {
        let [init, condition, increment, body] = stmt
            .counting_loop_parts()
            .ok_or_else(|| CodegenError::malformed(stmt.kind, "expected init, condition, increment and body"))?;
        let top = self.labels.fresh("top");
        let exit = self.labels.fresh("exit");

        // The loop variable lives in its own frame around the whole loop.
        self.frame.push_block();
        self.lower_loop_clause(init, ctx)?;
        self.text.label(&top);
        let reg = self.eval(condition)?;
        instr!(self.text, "beq {}, $zero, {}", reg, exit);
        self.pool.free(reg);

        self.targets.push(JumpTarget {
            kind: TargetKind::CountingLoop,
            exit: exit.clone(),
            depth: self.frame.depth(),
        });
        // Locals declared directly in the body are released every iteration.
        self.frame.push_block();
        self.lower_statement(body, ctx)?;
        self.close_block();
        self.targets.pop();

        self.lower_loop_clause(increment, ctx)?;
        instr!(self.text, "j {}", top);
        self.text.label(&exit);
        self.close_block();
        Ok(())
    }

    /// Init and increment clauses: expressions are evaluated and discarded.
    fn lower_loop_clause(&mut self, clause: &Node, ctx: ExecContext) -> CodegenResult<()> {
        if clause.kind.is_expression() {
            self.discard(clause)
        } else {
            self.lower_statement(clause, ctx)
        }
    }

    fn lower_return(&mut self, stmt: &Node, ctx: ExecContext) -> CodegenResult<()> {
        match stmt.children.as_slice() {
            [] => {}
            [value] => {
                let reg = self.eval(value)?;
                instr!(self.text, "move $v0, {}", reg);
                self.pool.free(reg);
            }
            _ => return Err(CodegenError::malformed(stmt.kind, "expected at most one value")),
        }
        match ctx {
            ExecContext::Main => instr!(self.text, "j {}", self.main_exit),
            ExecContext::Function => self.emit_function_return(),
        }
        Ok(())
    }

    /// Reset `$sp` to the given frame depth before jumping out of blocks.
    fn restore_depth(&mut self, depth: u32) {
        if self.frame.depth() == depth {
            return;
        }
        if depth == 0 {
            instr!(self.text, "move $sp, $fp");
        } else {
            instr!(self.text, "addi $sp, $fp, -{}", depth);
        }
    }

    // ========================================================================
    // Storage
    // ========================================================================

    fn locate(&self, name: &str) -> CodegenResult<Location> {
        if let Some(slot) = self.frame.lookup(name) {
            return Ok(Location::Frame(slot));
        }
        match self.symbols.lookup_global(name) {
            Some(symbol) if symbol.kind == SymbolKind::Variable => {
                let array_words = if symbol.is_array() {
                    let words = symbol
                        .word_count()
                        .ok_or_else(|| CodegenError::StorageOverflow(name.to_string()))?;
                    Some(words)
                } else {
                    None
                };
                Ok(Location::Global { name: symbol.name.clone(), array_words })
            }
            _ => Err(CodegenError::UnresolvedName(name.to_string())),
        }
    }

    fn load_from(&mut self, reg: Reg, location: &Location) {
        match location {
            Location::Frame(slot) => instr!(self.text, "lw {}, {}($fp)", reg, slot.offset),
            Location::Global { name, .. } => instr!(self.text, "lw {}, {}", reg, name),
        }
    }

    fn store_to(&mut self, reg: Reg, location: &Location) {
        match location {
            Location::Frame(slot) => instr!(self.text, "sw {}, {}($fp)", reg, slot.offset),
            Location::Global { name, .. } => instr!(self.text, "sw {}, {}", reg, name),
        }
    }

    /// Load the address of an array's first element.
    fn load_address(&mut self, reg: Reg, location: &Location) {
        match location {
            Location::Frame(slot) if slot.kind == SlotKind::Reference => {
                instr!(self.text, "lw {}, {}($fp)", reg, slot.offset)
            }
            Location::Frame(slot) => instr!(self.text, "addi {}, $fp, {}", reg, slot.offset),
            Location::Global { name, .. } => instr!(self.text, "la {}, {}", reg, name),
        }
    }

    /// Scale `index` to a byte offset and return the memory operand that
    /// addresses that element.
    fn element_operand(&mut self, index: Reg, location: &Location) -> CodegenResult<String> {
        instr!(self.text, "sll {}, {}, 2", index, index);
        let operand = match location {
            Location::Frame(slot) if slot.kind == SlotKind::Reference => {
                let base = self.pool.alloc()?;
                instr!(self.text, "lw {}, {}($fp)", base, slot.offset);
                instr!(self.text, "add {}, {}, {}", index, index, base);
                self.pool.free(base);
                format!("0({})", index)
            }
            Location::Frame(slot) => {
                instr!(self.text, "add {}, {}, $fp", index, index);
                format!("{}({})", slot.offset, index)
            }
            Location::Global { name, .. } => format!("{}({})", name, index),
        };
        Ok(operand)
    }

    /// Evaluate `value` into `dest`.
    fn assign(&mut self, dest: &Location, value: &Node) -> CodegenResult<()> {
        let source_words = self.known_array_words(value);
        let reg = self.eval(value)?;
        self.store_value(dest, reg, source_words)
    }

    /// Store an evaluated value and release its register. An array held in
    /// place receives a copy of the elements `src` points to, bounded by
    /// `source_words` when the source size is known. Scalars and array
    /// references take the single word.
    fn store_value(&mut self, dest: &Location, src: Reg, source_words: Option<u32>) -> CodegenResult<()> {
        match dest.array_words() {
            Some(words) => {
                let count = source_words.map_or(words, |n| n.min(words));
                self.copy_words(dest, src, count)
            }
            None => {
                self.store_to(src, dest);
                self.pool.free(src);
                Ok(())
            }
        }
    }

    /// Word-by-word copy loop from the address in `src` into `dest`.
    fn copy_words(&mut self, dest: &Location, src: Reg, count: u32) -> CodegenResult<()> {
        let dst = self.pool.alloc()?;
        let remaining = self.pool.alloc()?;
        let word = self.pool.alloc()?;
        let top = self.labels.fresh("copy");
        let done = self.labels.fresh("copyend");
        self.text.comment("copy array elements");
        self.load_address(dst, dest);
        instr!(self.text, "li {}, {}", remaining, count);
        self.text.label(&top);
        instr!(self.text, "blez {}, {}", remaining, done);
        instr!(self.text, "lw {}, 0({})", word, src);
        instr!(self.text, "sw {}, 0({})", word, dst);
        instr!(self.text, "addi {}, {}, {}", src, src, WORD);
        instr!(self.text, "addi {}, {}, {}", dst, dst, WORD);
        instr!(self.text, "addi {}, {}, -1", remaining, remaining);
        instr!(self.text, "j {}", top);
        self.text.label(&done);
        for reg in [word, remaining, dst, src] {
            self.pool.free(reg);
        }
        Ok(())
    }

    /// Element count of the array `expr` names, when it is stored in place.
    fn known_array_words(&self, expr: &Node) -> Option<u32> {
        if expr.kind != NodeKind::Identifier {
            return None;
        }
        self.locate(expr.text()).ok()?.array_words()
    }

    fn string_label(&mut self, text: &str) -> Label {
        if let Some(label) = self.string_labels.get(text) {
            return label.clone();
        }
        let label = self.labels.fresh("str");
        self.strings.push((label.clone(), text.to_string()));
        self.string_labels.insert(text.to_string(), label.clone());
        label
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Evaluate an expression into a freshly allocated register. On return,
    /// exactly one more register is in use than before.
    fn eval(&mut self, expr: &Node) -> CodegenResult<Reg> {
        match expr.kind {
            NodeKind::IntLiteral => {
                let value = expr.int_value().ok_or_else(|| invalid_literal(expr))?;
                self.load_immediate(value)
            }
            NodeKind::FloatLiteral => {
                // Integer-only target: floats are truncated toward zero.
                let value = expr.float_value().ok_or_else(|| invalid_literal(expr))?;
                self.load_immediate(value.trunc() as i32)
            }
            NodeKind::BoolLiteral => {
                let value = expr.bool_value().ok_or_else(|| invalid_literal(expr))?;
                self.load_immediate(i32::from(value))
            }
            NodeKind::CharLiteral => {
                let value = expr.char_value().ok_or_else(|| invalid_literal(expr))?;
                self.load_immediate(value as i32)
            }
            NodeKind::StringLiteral => {
                let label = self.string_label(expr.string_value());
                let reg = self.pool.alloc()?;
                instr!(self.text, "la {}, {}", reg, label);
                Ok(reg)
            }
            // An array name evaluates to the address of its first element.
            NodeKind::Identifier => {
                let location = self.locate(expr.text())?;
                let reg = self.pool.alloc()?;
                if location.is_array() {
                    self.load_address(reg, &location);
                } else {
                    self.load_from(reg, &location);
                }
                Ok(reg)
            }
            NodeKind::ArrayAccess => self.eval_array_access(expr),
            NodeKind::Call => self.eval_call(expr),
            NodeKind::Operation => self.eval_operation(expr),
            kind => Err(CodegenError::malformed(kind, "expected an expression")),
        }
    }

    fn load_immediate(&mut self, value: i32) -> CodegenResult<Reg> {
        let reg = self.pool.alloc()?;
        instr!(self.text, "li {}, {}", reg, value);
        Ok(reg)
    }

    fn eval_array_access(&mut self, expr: &Node) -> CodegenResult<Reg> {
        let [index] = expr.children.as_slice() else {
            return Err(CodegenError::malformed(expr.kind, "expected a single index"));
        };
        let location = self.locate(expr.text())?;
        let reg = self.eval(index)?;
        let operand = self.element_operand(reg, &location)?;
        instr!(self.text, "lw {}, {}", reg, operand);
        Ok(reg)
    }

    /// Temporaries live across the call are saved around it, since the callee
    /// is free to use every `$t` register.
    fn eval_call(&mut self, call: &Node) -> CodegenResult<Reg> {
        let live = self.pool.in_use();
        if !live.is_empty() {
            self.text.comment("save live temporaries");
            instr!(self.text, "addi $sp, $sp, -{}", live.len() as u32 * WORD);
            for (i, reg) in live.iter().enumerate() {
                instr!(self.text, "sw {}, {}($sp)", reg, i as u32 * WORD);
            }
        }

        for arg in &call.children {
            let reg = self.eval(arg)?;
            instr!(self.text, "addi $sp, $sp, -{}", WORD);
            instr!(self.text, "sw {}, 0($sp)", reg);
            self.pool.free(reg);
        }
        instr!(self.text, "jal {}{}", FUNCTION_PREFIX, call.text());
        if !call.children.is_empty() {
            instr!(self.text, "addi $sp, $sp, {}", call.children.len() as u32 * WORD);
        }

        if !live.is_empty() {
            for (i, reg) in live.iter().enumerate() {
                instr!(self.text, "lw {}, {}($sp)", reg, i as u32 * WORD);
            }
            instr!(self.text, "addi $sp, $sp, {}", live.len() as u32 * WORD);
        }

        let reg = self.pool.alloc()?;
        instr!(self.text, "move {}, $v0", reg);
        Ok(reg)
    }

    fn eval_operation(&mut self, expr: &Node) -> CodegenResult<Reg> {
        let op = Operator::parse(expr.text(), expr.children.len()).ok_or_else(|| {
            CodegenError::malformed(expr.kind, format!("unknown operator '{}'", expr.text()))
        })?;

        if op.is_step() {
            return self.eval_step(expr, op);
        }
        if op.is_unary() {
            let reg = self.eval(&expr.children[0])?;
            match op {
                Operator::Neg => instr!(self.text, "sub {}, $zero, {}", reg, reg),
                _ => {
                    instr!(self.text, "sltu {}, $zero, {}", reg, reg);
                    instr!(self.text, "xori {}, {}, 1", reg, reg);
                }
            }
            return Ok(reg);
        }

        let left = self.eval(&expr.children[0])?;
        let right = self.eval(&expr.children[1])?;
        self.emit_binary(op, left, right)?;
        self.pool.free(right);
        Ok(left)
    }

    /// `++x` / `--x`: update the variable in place and yield the new value.
    fn eval_step(&mut self, expr: &Node, op: Operator) -> CodegenResult<Reg> {
        let [operand] = expr.children.as_slice() else {
            return Err(CodegenError::malformed(expr.kind, "expected one operand"));
        };
        if operand.kind != NodeKind::Identifier {
            return Err(CodegenError::malformed(expr.kind, "step operand must be a variable"));
        }
        let location = self.locate(operand.text())?;
        let reg = self.pool.alloc()?;
        self.load_from(reg, &location);
        let delta = if op == Operator::Inc { 1 } else { -1 };
        instr!(self.text, "addi {}, {}, {}", reg, reg, delta);
        self.store_to(reg, &location);
        Ok(reg)
    }

    /// Combine `left op right` into `left`.
    fn emit_binary(&mut self, op: Operator, l: Reg, r: Reg) -> CodegenResult<()> {
        match op {
            Operator::Add => instr!(self.text, "add {}, {}, {}", l, l, r),
            Operator::Sub => instr!(self.text, "sub {}, {}, {}", l, l, r),
            Operator::Mul => {
                instr!(self.text, "mult {}, {}", l, r);
                instr!(self.text, "mflo {}", l);
            }
            Operator::Div | Operator::IntDiv | Operator::Mod => self.emit_guarded_division(op, l, r),
            Operator::Pow => self.emit_power(l, r)?,
            Operator::Lt => instr!(self.text, "slt {}, {}, {}", l, l, r),
            Operator::Gt => instr!(self.text, "slt {}, {}, {}", l, r, l),
            Operator::Le => {
                instr!(self.text, "slt {}, {}, {}", l, r, l);
                instr!(self.text, "xori {}, {}, 1", l, l);
            }
            Operator::Ge => {
                instr!(self.text, "slt {}, {}, {}", l, l, r);
                instr!(self.text, "xori {}, {}, 1", l, l);
            }
            Operator::Eq => {
                instr!(self.text, "xor {}, {}, {}", l, l, r);
                instr!(self.text, "sltiu {}, {}, 1", l, l);
            }
            Operator::Ne => {
                instr!(self.text, "xor {}, {}, {}", l, l, r);
                instr!(self.text, "sltu {}, $zero, {}", l, l);
            }
            Operator::And | Operator::Or => {
                instr!(self.text, "sltu {}, $zero, {}", l, l);
                instr!(self.text, "sltu {}, $zero, {}", r, r);
                let mnemonic = if op == Operator::And { "and" } else { "or" };
                instr!(self.text, "{} {}, {}, {}", mnemonic, l, l, r);
            }
            Operator::Not | Operator::Neg | Operator::Inc | Operator::Dec => {
                return Err(CodegenError::malformed(NodeKind::Operation, "unary operator with two operands"));
            }
        }
        Ok(())
    }

    /// A zero divisor skips the divide and yields 0.
    fn emit_guarded_division(&mut self, op: Operator, l: Reg, r: Reg) {
        let zero = self.labels.fresh("divzero");
        let join = self.labels.fresh("divend");
        self.text.comment("guard against division by zero");
        instr!(self.text, "beq {}, $zero, {}", r, zero);
        instr!(self.text, "div {}, {}", l, r);
        if op == Operator::Mod {
            instr!(self.text, "mfhi {}", l);
        } else {
            instr!(self.text, "mflo {}", l);
        }
        instr!(self.text, "j {}", join);
        self.text.label(&zero);
        instr!(self.text, "li {}, 0", l);
        self.text.label(&join);
    }

    /// Integer power by repeated multiplication; a non-positive exponent
    /// yields 1. Consumes the exponent register.
    fn emit_power(&mut self, base: Reg, exponent: Reg) -> CodegenResult<()> {
        let acc = self.pool.alloc()?;
        let top = self.labels.fresh("pow");
        let done = self.labels.fresh("powend");
        instr!(self.text, "li {}, 1", acc);
        self.text.label(&top);
        instr!(self.text, "blez {}, {}", exponent, done);
        instr!(self.text, "mult {}, {}", acc, base);
        instr!(self.text, "mflo {}", acc);
        instr!(self.text, "addi {}, {}, -1", exponent, exponent);
        instr!(self.text, "j {}", top);
        self.text.label(&done);
        instr!(self.text, "move {}, {}", base, acc);
        self.pool.free(acc);
        Ok(())
    }
}

/// Whether control never falls off the end of these statements.
fn ends_in_jump(statements: &[&Node]) -> bool {
    statements
        .last()
        .is_some_and(|s| matches!(s.kind, NodeKind::Return | NodeKind::Break))
}

fn is_step(expr: &Node) -> bool {
    Operator::parse(expr.text(), expr.children.len()).is_some_and(Operator::is_step)
}

fn invalid_literal(expr: &Node) -> CodegenError {
    CodegenError::malformed(expr.kind, format!("invalid literal '{}'", expr.text()))
}

/// The top-level pieces of a `Program`, in tree order.
struct ProgramSections<'t> {
    globals: Vec<&'t Node>,
    functions: Vec<&'t Node>,
    main: Option<&'t Node>,
}

impl<'t> ProgramSections<'t> {
    fn split(program: &'t Node) -> CodegenResult<Self> {
        let mut sections = ProgramSections {
            globals: Vec::new(),
            functions: Vec::new(),
            main: None,
        };
        for section in &program.children {
            match section.kind {
                NodeKind::GlobalsBlock => sections.globals.extend(section.children.iter()),
                NodeKind::GlobalDecl => sections.globals.push(section),
                NodeKind::FunctionsBlock => sections.functions.extend(section.children.iter()),
                NodeKind::Function => sections.functions.push(section),
                NodeKind::Main if sections.main.is_none() => sections.main = Some(section),
                kind => return Err(CodegenError::malformed(kind, "unexpected child of Program")),
            }
        }
        Ok(sections)
    }
}
