//! LLVM lowering for Grace.
//!
//! `CodeGen` owns the LLVM `Context` handle, `Module`, `Builder` and the
//! caches shared by the lowering passes. Lowering is organized across
//! submodules:
//! - `frames` : the lowering symbol table and the activation-frame model
//! - `func`   : function lowering (frame synthesis, nested definitions)
//! - `expr`   : expression, l-value and condition lowering
//! - `stmt`   : statement lowering
//!
//! The builder's current insertion block is the only piece of mutable state
//! threaded implicitly between lowering routines; everything else lives in
//! explicit fields on `CodeGen`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::passes::PassManager;
use inkwell::targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetTriple};
use inkwell::types::{BasicType, BasicTypeEnum, FunctionType, IntType, PointerType};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::{AddressSpace, OptimizationLevel};

use grace_ast::{DataType, FparType, GraceType, Program, RetType};

use crate::diagnostics::{Diagnostic, DiagnosticResult};

pub mod frames;

mod expr;
mod func;
mod stmt;

use frames::{Entry, FrameTable, FuncEntry};

/// The triple every emitted module targets.
pub const TARGET_TRIPLE: &str = "x86_64-pc-linux-gnu";

/// Per-function lowering context.
pub(crate) struct FnCtx<'ctx> {
    pub function: FunctionValue<'ctx>,
    pub ret: RetType,
    /// The program entry is emitted as `main` returning `i64` regardless of
    /// its declared return type.
    pub outermost: bool,
}

/// Code generation context holding LLVM state and caches.
pub struct CodeGen<'ctx> {
    pub context: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    /// Per-function pipeline run after each function is emitted.
    fpm: PassManager<FunctionValue<'ctx>>,
    pub i64_t: IntType<'ctx>,
    pub i8_t: IntType<'ctx>,
    pub bool_t: IntType<'ctx>,
    pub i8ptr_t: PointerType<'ctx>,
    next_str_id: Cell<u32>,
    string_literals: RefCell<HashMap<Vec<u8>, PointerValue<'ctx>>>,
    pub frames: RefCell<FrameTable<'ctx>>,
}

impl<'ctx> CodeGen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);

        let triple = TargetTriple::create(TARGET_TRIPLE);
        module.set_triple(&triple);
        // the data layout comes from the LLVM target when it is available
        Target::initialize_all(&InitializationConfig::default());
        if let Ok(target) = Target::from_triple(&triple) {
            if let Some(tm) = target.create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::Default,
                CodeModel::Default,
            ) {
                module.set_data_layout(&tm.get_target_data().get_data_layout());
            }
        }

        let fpm: PassManager<FunctionValue<'ctx>> = PassManager::create(&module);
        fpm.add_promote_memory_to_register_pass();
        fpm.add_instruction_combining_pass();
        fpm.add_reassociate_pass();
        fpm.add_gvn_pass();
        fpm.add_cfg_simplification_pass();
        fpm.initialize();

        let builder = context.create_builder();
        CodeGen {
            context,
            module,
            builder,
            fpm,
            i64_t: context.i64_type(),
            i8_t: context.i8_type(),
            bool_t: context.bool_type(),
            i8ptr_t: context.i8_type().ptr_type(AddressSpace::default()),
            next_str_id: Cell::new(0),
            string_literals: RefCell::new(HashMap::new()),
            frames: RefCell::new(FrameTable::new()),
        }
    }

    /// Lowers a whole program into the module and verifies the result.
    pub fn lower_program(&self, program: &Program) -> DiagnosticResult<()> {
        self.frames.borrow_mut().push_scope("#runtime");
        self.declare_runtime();
        self.lower_function(&program.entry, true)?;
        self.frames.borrow_mut().pop_scope();

        if let Err(message) = self.module.verify() {
            return Err(Diagnostic::bug(format!(
                "emitted module failed verification: {}",
                message.to_string()
            )));
        }
        Ok(())
    }

    /// Runs a whole-module pipeline on top of the per-function passes;
    /// enabled by the `-O` driver flag.
    pub fn run_aggressive_pipeline(&self) {
        let mpm: PassManager<Module<'ctx>> = PassManager::create(());
        mpm.add_function_inlining_pass();
        mpm.add_promote_memory_to_register_pass();
        mpm.add_instruction_combining_pass();
        mpm.add_reassociate_pass();
        mpm.add_gvn_pass();
        mpm.add_cfg_simplification_pass();
        mpm.add_global_dce_pass();
        mpm.run_on(&self.module);
    }

    /// Adds the runtime-library declarations to the module and binds them in
    /// the bottom scope. Must run before any user code is lowered.
    fn declare_runtime(&self) {
        for f in crate::runtime::library() {
            let mut param_types = Vec::new();
            for group in &f.params {
                for _ in 0..group.count {
                    param_types.push(self.fpar_abi_type(&group.fpar, group.by_ref));
                }
            }
            let fn_ty = self.function_type(&f.ret, &param_types);
            let value = self.module.add_function(f.name, fn_ty, None);
            self.frames.borrow_mut().insert(
                f.name,
                Entry::Func(FuncEntry { value, is_runtime: true, scope_no: 0, param_types }),
            );
        }
    }

    // --- type mapping ---

    pub(crate) fn data_ir_type(&self, dt: DataType) -> IntType<'ctx> {
        match dt {
            DataType::Int => self.i64_t,
            DataType::Char => self.i8_t,
        }
    }

    /// The IR type of a value stored inline: scalars as integers, arrays
    /// nested right-to-left so the outermost dimension is outermost.
    pub(crate) fn inline_type(&self, ty: &GraceType) -> BasicTypeEnum<'ctx> {
        let mut t: BasicTypeEnum<'ctx> = self.data_ir_type(ty.data).into();
        for &d in ty.dims.iter().rev() {
            t = t.array_type(d as u32).into();
        }
        t
    }

    /// The object type seen through an unknown-dimension parameter: the
    /// element type after the unspecified dimension is dropped.
    pub(crate) fn fpar_elem_type(&self, fp: &FparType) -> BasicTypeEnum<'ctx> {
        self.inline_type(&GraceType { data: fp.data, dims: fp.dims.clone() })
    }

    /// The ABI slot/argument type of a formal parameter: scalars by value
    /// stay scalars, everything else is a pointer to the object.
    pub(crate) fn fpar_abi_type(&self, fp: &FparType, by_ref: bool) -> BasicTypeEnum<'ctx> {
        if fp.unknown_first || by_ref || !fp.dims.is_empty() {
            self.fpar_elem_type(fp)
                .ptr_type(AddressSpace::default())
                .into()
        } else {
            self.data_ir_type(fp.data).into()
        }
    }

    pub(crate) fn function_type(
        &self,
        ret: &RetType,
        params: &[BasicTypeEnum<'ctx>],
    ) -> FunctionType<'ctx> {
        let args: Vec<inkwell::types::BasicMetadataTypeEnum<'ctx>> =
            params.iter().map(|&t| t.into()).collect();
        match ret {
            RetType::Nothing => self.context.void_type().fn_type(&args, false),
            RetType::Data(dt) => self.data_ir_type(*dt).fn_type(&args, false),
        }
    }

    // --- shared lowering helpers ---

    /// Branches to `bb` unless the current block already has a terminator.
    pub(crate) fn ensure_unconditional_branch(
        &self,
        bb: inkwell::basic_block::BasicBlock<'ctx>,
    ) -> DiagnosticResult<()> {
        if let Some(cur) = self.builder.get_insert_block() {
            if cur.get_terminator().is_none() {
                self.builder.build_unconditional_branch(bb)?;
            }
        }
        Ok(())
    }

    /// Interns a string literal as a private NUL-terminated byte array and
    /// returns the pointer to it. Identical literals share one global.
    pub(crate) fn intern_string_literal(&self, bytes: &[u8]) -> PointerValue<'ctx> {
        if let Some(ptr) = self.string_literals.borrow().get(bytes) {
            return *ptr;
        }

        let id = self.next_str_id.get();
        self.next_str_id.set(id.wrapping_add(1));

        let arr_ty = self.i8_t.array_type(bytes.len() as u32 + 1);
        let gv = self.module.add_global(arr_ty, None, &format!("strlit.{}", id));
        gv.set_initializer(&self.context.const_string(bytes, true));
        gv.set_constant(true);

        let ptr = gv.as_pointer_value();
        self.string_literals.borrow_mut().insert(bytes.to_vec(), ptr);
        ptr
    }

    /// Emits the fall-through return value: zero for the program entry, the
    /// declared default otherwise.
    pub(crate) fn emit_default_return(&self, fcx: &FnCtx<'ctx>) -> DiagnosticResult<()> {
        if fcx.outermost {
            self.builder.build_return(Some(&self.i64_t.const_zero()))?;
            return Ok(());
        }
        match fcx.ret {
            RetType::Nothing => {
                self.builder.build_return(None)?;
            }
            RetType::Data(dt) => {
                let zero = self.data_ir_type(dt).const_zero();
                self.builder.build_return(Some(&zero))?;
            }
        }
        Ok(())
    }

    pub(crate) fn expect_int(
        &self,
        value: BasicValueEnum<'ctx>,
        what: &str,
    ) -> DiagnosticResult<inkwell::values::IntValue<'ctx>> {
        match value {
            BasicValueEnum::IntValue(v) => Ok(v),
            other => Err(Diagnostic::bug(format!(
                "{} produced a non-scalar value: {:?}",
                what, other
            ))),
        }
    }
}
