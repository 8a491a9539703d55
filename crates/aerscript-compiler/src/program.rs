//! The compiled program handed to the VM.
//!
//! Besides the main instruction container, the program owns every table an
//! instruction may refer to by id: switch, foreach and exception
//! descriptors, class links and closures.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::bytecode::{Constant, ConstantPool, InstrList, Operand};
use crate::class::{ClassDesc, ClassLink};
use crate::func::FunctionDesc;

/// One `case` of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseDesc {
    /// Guard expression sub-program, ending in `DONE`.
    pub expr: InstrList,
    /// First instruction of the case body.
    pub start: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SwitchDesc {
    pub cases: Vec<CaseDesc>,
    pub default_start: Option<u32>,
    /// First instruction after the switch.
    pub out: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForeachDesc {
    pub key: Option<String>,
    pub value: String,
    /// `foreach ($a as &$v)`
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchDesc {
    pub class: String,
    pub var: String,
    pub code: InstrList,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExceptionDesc {
    pub catches: Vec<CatchDesc>,
}

/// `const NAME = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct NamedConstant {
    pub name: String,
    pub code: InstrList,
}

/// Why a declaration could not be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    Duplicate,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub main: InstrList,
    pub constants: ConstantPool,
    functions: Vec<FunctionDesc>,
    /// name -> (signature hash, index into `functions`)
    overloads: FxHashMap<String, Vec<(Option<u64>, usize)>>,
    classes: Vec<ClassDesc>,
    class_index: FxHashMap<String, usize>,
    pub named_constants: Vec<NamedConstant>,
    pub switches: Vec<SwitchDesc>,
    pub foreach: Vec<ForeachDesc>,
    pub exceptions: Vec<ExceptionDesc>,
    pub class_links: Vec<ClassLink>,
    pub closures: Vec<FunctionDesc>,
}

impl Program {
    pub fn new(constants: ConstantPool) -> Self {
        Self {
            constants,
            ..Self::default()
        }
    }

    // =========================================
    // Functions
    // =========================================

    /// Install a function. Same-named functions are overloads; a second one
    /// with an identical signature is rejected.
    pub fn install_function(&mut self, func: FunctionDesc) -> Result<(), InstallError> {
        let hash = func.signature.as_ref().map(|s| s.hash());
        let entry = self.overloads.entry(func.name.clone()).or_default();
        if entry.iter().any(|(h, _)| *h == hash) {
            return Err(InstallError::Duplicate);
        }
        entry.push((hash, self.functions.len()));
        self.functions.push(func);
        Ok(())
    }

    pub fn functions(&self) -> &[FunctionDesc] {
        &self.functions
    }

    /// All overloads of `name`, in declaration order.
    pub fn overloads(&self, name: &str) -> impl Iterator<Item = &FunctionDesc> {
        self.overloads
            .get(name)
            .into_iter()
            .flatten()
            .map(|&(_, idx)| &self.functions[idx])
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDesc> {
        self.overloads(name).next()
    }

    // =========================================
    // Classes
    // =========================================

    pub fn install_class(&mut self, class: ClassDesc) -> Result<(), InstallError> {
        if self.class_index.contains_key(&class.name) {
            return Err(InstallError::Duplicate);
        }
        self.class_index.insert(class.name.clone(), self.classes.len());
        self.classes.push(class);
        Ok(())
    }

    pub fn class(&self, name: &str) -> Option<&ClassDesc> {
        self.class_index.get(name).map(|&idx| &self.classes[idx])
    }

    pub fn classes(&self) -> &[ClassDesc] {
        &self.classes
    }

    pub fn named_constant(&self, name: &str) -> Option<&NamedConstant> {
        self.named_constants.iter().find(|c| c.name == name)
    }

    // =========================================
    // Descriptor tables
    // =========================================

    pub fn add_switch(&mut self, desc: SwitchDesc) -> u32 {
        self.switches.push(desc);
        (self.switches.len() - 1) as u32
    }

    pub fn add_foreach(&mut self, desc: ForeachDesc) -> u32 {
        self.foreach.push(desc);
        (self.foreach.len() - 1) as u32
    }

    pub fn add_exception(&mut self, desc: ExceptionDesc) -> u32 {
        self.exceptions.push(desc);
        (self.exceptions.len() - 1) as u32
    }

    pub fn add_class_link(&mut self, link: ClassLink) -> u32 {
        self.class_links.push(link);
        (self.class_links.len() - 1) as u32
    }

    pub fn add_closure(&mut self, func: FunctionDesc) -> u32 {
        self.closures.push(func);
        (self.closures.len() - 1) as u32
    }

    // =========================================
    // Listing
    // =========================================

    /// Every instruction container of the program with a label, `main`
    /// first. Jump targets inside a container index that container only.
    pub fn containers(&self) -> Vec<(String, &InstrList)> {
        let mut out = vec![("main".to_owned(), &self.main)];
        for func in &self.functions {
            let name = format!("function {}({})", func.name, func.signature_key().unwrap_or_default());
            function_containers(&mut out, name, func);
        }
        for (idx, func) in self.closures.iter().enumerate() {
            function_containers(&mut out, format!("closure#{idx} {}", func.name), func);
        }
        for class in &self.classes {
            for attr in &class.attrs {
                if let Some(init) = &attr.init {
                    out.push((format!("attr {}::${}", class.name, attr.name), init));
                }
            }
            for method in &class.methods {
                let name = format!("method {}::{}", class.name, method.func.name);
                function_containers(&mut out, name, &method.func);
            }
        }
        for constant in &self.named_constants {
            out.push((format!("const {}", constant.name), &constant.code));
        }
        for (idx, switch) in self.switches.iter().enumerate() {
            for (case, desc) in switch.cases.iter().enumerate() {
                out.push((format!("switch#{idx} case {case} -> {:04}", desc.start), &desc.expr));
            }
        }
        for (idx, exception) in self.exceptions.iter().enumerate() {
            for catch in &exception.catches {
                out.push((format!("catch#{idx} {} ${}", catch.class, catch.var), &catch.code));
            }
        }
        out
    }

    /// Render a text listing of every container.
    ///
    /// ```text
    /// main:
    ///   0000  LOADC           0     3             ; line 1
    ///   0001  STORE           0     0  $a         ; line 1
    /// ```
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (title, code) in self.containers() {
            list_container(&mut out, &title, code);
        }
        out.push_str("constants:\n");
        for (idx, constant) in self.constants.constants().iter().enumerate() {
            let value = match constant {
                Constant::Null => "null".to_owned(),
                Constant::Bool(b) => b.to_string(),
                Constant::Int(i) => i.to_string(),
                Constant::Real(r) => r.to_string(),
                Constant::String(s) => format!("{s:?}"),
            };
            let _ = writeln!(out, "  {idx:>4}  {value}");
        }
        out
    }
}

fn function_containers<'a>(out: &mut Vec<(String, &'a InstrList)>, name: String, func: &'a FunctionDesc) {
    for arg in &func.args {
        if let Some(default) = &arg.default {
            out.push((format!("{name} default ${}", arg.name), default));
        }
    }
    for var in &func.statics {
        out.push((format!("{name} static ${}", var.name), &var.init));
    }
    out.push((name, &func.code));
}

fn list_container(out: &mut String, title: &str, code: &InstrList) {
    let _ = writeln!(out, "{title}:");
    for (idx, instr) in code.iter().enumerate() {
        let p3 = if instr.p3 == Operand::None {
            String::new()
        } else {
            instr.p3.to_string()
        };
        let _ = writeln!(
            out,
            "  {idx:04}  {:<14} {:>5} {:>5}  {p3:<10} ; line {}",
            instr.op.as_str(),
            instr.p1,
            instr.p2,
            instr.line
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Instruction, Opcode};
    use crate::class::ClassFlags;
    use crate::func::{DataType, Signature, TypeSpec};

    fn func(name: &str, sig: Option<&[DataType]>) -> FunctionDesc {
        let mut desc = FunctionDesc::new(name, TypeSpec::builtin(DataType::Void), 1);
        desc.signature = sig.map(|types| {
            let mut sig = Signature::new();
            for ty in types {
                sig.push(TypeSpec::builtin(*ty));
            }
            sig
        });
        desc
    }

    #[test]
    fn overloads_by_signature() {
        let mut program = Program::default();
        program
            .install_function(func("add", Some(&[DataType::Int, DataType::Int])))
            .unwrap();
        program
            .install_function(func("add", Some(&[DataType::Float, DataType::Float])))
            .unwrap();
        assert_eq!(
            program.install_function(func("add", Some(&[DataType::Int, DataType::Int]))),
            Err(InstallError::Duplicate)
        );
        assert_eq!(program.overloads("add").count(), 2);
        assert_eq!(program.function("add").unwrap().signature_key().unwrap(), "ii");
    }

    #[test]
    fn duplicate_class_rejected() {
        let mut program = Program::default();
        assert!(program.install_class(ClassDesc::new("A", ClassFlags::empty(), 1)).is_ok());
        assert_eq!(
            program.install_class(ClassDesc::new("A", ClassFlags::FINAL, 2)),
            Err(InstallError::Duplicate)
        );
        assert!(program.class("A").is_some());
    }

    #[test]
    fn disassemble_lists_main_and_constants() {
        let mut program = Program::default();
        let idx = program.constants.add_int(42);
        program
            .main
            .push(Instruction::new(Opcode::Loadc, 0, idx, Operand::None, 1));
        program.main.push(Instruction::new(
            Opcode::Store,
            0,
            0,
            Operand::Name("a".into()),
            1,
        ));
        let listing = program.disassemble();
        assert!(listing.starts_with("main:\n"));
        assert!(listing.contains("LOADC"));
        assert!(listing.contains("$a"));
        assert!(listing.contains("42"));
    }
}
