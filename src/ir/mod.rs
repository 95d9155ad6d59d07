//! Stack IR generation
//!
//! Lowers a [`CheckedProgram`](crate::semantic::CheckedProgram) into
//! routines of stack machine [`Instruction`]s:
//! - [`instruction`]: opcodes, operands and per-instruction stack effects
//! - [`slots`]: per-routine local slot allocation
//! - [`program`]: routines, stack validation and the generated program
//! - `generator`: routine construction, plus statement and expression
//!   lowering in `statements.rs` and `expressions.rs`

mod expressions;
mod generator;
pub mod instruction;
pub mod program;
pub mod slots;
mod statements;

pub use generator::generate;
pub use instruction::{Instruction, LabelId, Opcode, Operand};
pub use program::{IrProgram, Routine, RoutineKind, StackUnderflow};
pub use slots::{LocalSlot, SlotAllocator, SlotsExhausted};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::semantic::{analyze, Type};
    use Opcode::*;

    fn lower(source: &str) -> IrProgram {
        let output = parse_source(source);
        assert!(output.is_success(), "parse failed: {:?}", output.messages());
        generate(&analyze(&output.unit))
    }

    fn routine<'p>(program: &'p IrProgram, name: &str) -> &'p Routine {
        program
            .routine(name)
            .unwrap_or_else(|| panic!("no routine '{}' in {:?}", name, program.routines))
    }

    fn call_operand(instruction: &Instruction) -> (&str, usize) {
        match &instruction.operand {
            Some(Operand::Call { target, argc }) => (target.as_str(), *argc),
            other => panic!("Expected call operand, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        let program = lower("int x = 2 + 3 * 4;");
        let main = routine(&program, "<main>");

        assert_eq!(main.opcodes(), vec![Push, Push, Push, Mul, Add, Store, Return]);
        assert_eq!(main.slot_of("x"), Some(0));
        assert_eq!(main.code[5].slot, Some(0));
        assert_eq!(main.code[5].ty, Type::Int);
        assert_eq!(main.max_stack, 3);
    }

    #[test]
    fn test_class_routines() {
        let program = lower(
            "class Counter {\n\
             \x20 int count = 0;\n\
             \x20 float ratio;\n\
             \x20 void add(int n) { float scale = 1.5; count += n; }\n\
             \x20 static int zero() { return 0; }\n\
             }\n",
        );

        let names: Vec<_> = program.routines.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["<main>", "Counter.<init>", "Counter.add", "Counter.zero"]);

        let init = routine(&program, "Counter.<init>");
        assert_eq!(init.kind, RoutineKind::Constructor);
        assert_eq!(init.opcodes(), vec![Load, Push, PutField, Return]);

        let add = routine(&program, "Counter.add");
        assert!(add.is_instance);
        assert_eq!(add.slot_of("this"), Some(0));
        assert_eq!(add.slot_of("n"), Some(1));
        assert_eq!(add.slot_of("scale"), Some(2));
        assert_eq!(
            add.opcodes(),
            vec![Push, Store, Load, Dup, GetField, Load, Add, PutField, Return]
        );
        assert_eq!(
            add.code[7].operand,
            Some(Operand::Symbol("Counter.count".to_string()))
        );

        let zero = routine(&program, "Counter.zero");
        assert!(!zero.is_instance);
        assert!(zero.locals.is_empty());
        assert_eq!(zero.opcodes(), vec![Push, Return]);
        assert_eq!(zero.code[1].ty, Type::Int);
    }

    #[test]
    fn test_object_construction_and_calls() {
        let program = lower(
            "class P { int v; int get() { return v; } }\n\
             P p = new P();\n\
             int r = p.get();\n\
             println(r);\n",
        );
        let main = routine(&program, "<main>");

        assert_eq!(
            main.opcodes(),
            vec![New, Dup, InvokeConstructor, Store, Load, Call, Store, Load, Call, Return]
        );
        assert_eq!(call_operand(&main.code[2]), ("P.<init>", 1));
        assert_eq!(call_operand(&main.code[5]), ("P.get", 1));
        assert_eq!(call_operand(&main.code[8]), ("println", 1));
        assert_eq!(main.slot_of("p"), Some(0));
        assert_eq!(main.slot_of("r"), Some(1));

        let get = routine(&program, "P.get");
        assert_eq!(get.opcodes(), vec![Load, GetField, Return]);
        assert_eq!(get.code[0].slot, Some(0));
    }

    #[test]
    fn test_discarded_values_are_popped() {
        let program = lower("int f() { return 1; }\nvoid g() { }\nf();\ng();\n");
        let main = routine(&program, "<main>");

        assert_eq!(main.opcodes(), vec![Call, Pop, Call, Return]);
        assert!(program.routines.iter().all(|r| r.check_stack().is_ok()));
    }

    #[test]
    fn test_control_flow_labels() {
        let program = lower(
            "int total = 0;\n\
             for (int i = 0; i < 3; i += 1) { if i == 1 { continue; } total += i; }\n\
             while total > 0 { total -= 1; break; }\n",
        );
        let main = routine(&program, "<main>");

        let placed: Vec<_> = main
            .code
            .iter()
            .filter(|i| i.opcode == Label)
            .filter_map(|i| i.operand.clone())
            .collect();
        // three for the `for`, one for the `if`, two for the `while`
        assert_eq!(placed.len(), 6);

        for jump in main.code.iter().filter(|i| matches!(i.opcode, Jump | JumpIfFalse)) {
            let target = jump.operand.clone().expect("jump without target");
            assert!(placed.contains(&target), "jump to unplaced label {:?}", target);
        }

        assert_eq!(main.slot_of("total"), Some(0));
        assert_eq!(main.slot_of("i"), Some(1));
        assert_eq!(main.check_stack(), Ok(main.max_stack));
    }

    #[test]
    fn test_statements_with_errors_are_skipped() {
        let program = lower("int x = missing;\nPerson p = new Person();\nint y = 2;\n");
        let main = routine(&program, "<main>");

        assert_eq!(main.opcodes(), vec![Push, Store, Return]);
        // `x` exists even though its initializer was dropped; `p` has no class
        assert_eq!(main.slot_of("x"), Some(0));
        assert_eq!(main.slot_of("y"), Some(1));
        assert_eq!(main.slot_of("p"), None);
        assert_eq!(main.code[1].slot, Some(1));
    }

    #[test]
    fn test_call_targets() {
        let program = lower(
            "class M {\n\
             \x20 static int one() { return 1; }\n\
             \x20 int twice() { return two() + one(); }\n\
             \x20 int two() { return 2; }\n\
             }\n\
             int a = M.one();\n",
        );

        let main = routine(&program, "<main>");
        assert_eq!(main.opcodes(), vec![Call, Store, Return]);
        assert_eq!(call_operand(&main.code[0]), ("M.one", 0));

        let twice = routine(&program, "M.twice");
        assert_eq!(twice.opcodes(), vec![Load, Call, Call, Add, Return]);
        assert_eq!(call_operand(&twice.code[1]), ("M.two", 1));
        assert_eq!(call_operand(&twice.code[2]), ("M.one", 0));
    }

    #[test]
    fn test_globals_from_routines_have_no_slot() {
        let program = lower("int g = 1;\nint read() { return g; }\n");

        let read = routine(&program, "read");
        assert_eq!(read.kind, RoutineKind::Function);
        assert_eq!(read.opcodes(), vec![Load, Return]);
        assert_eq!(read.code[0].slot, None);

        let main = routine(&program, "<main>");
        assert_eq!(main.code[1].slot, Some(0));
    }

    #[test]
    fn test_top_level_variables_slotted_before_declaration() {
        let program = lower("print(x);
int x = 1;
print(x);
if true { float y = 2.0; }
bool z = false;
");
        let main = routine(&program, "<main>");

        assert_eq!(main.slot_of("x"), Some(0));
        assert_eq!(main.slot_of("z"), Some(1));
        assert_eq!(main.slot_of("y"), Some(2));

        let accesses: Vec<_> = main
            .code
            .iter()
            .filter(|i| i.operand == Some(Operand::Symbol("x".to_string())))
            .map(|i| (i.opcode, i.slot))
            .collect();
        assert_eq!(accesses, vec![(Load, Some(0)), (Store, Some(0)), (Load, Some(0))]);
    }

    #[test]
    fn test_routine_out_of_slots_still_generates() {
        let mut source = String::from("void big() {\n");
        for i in 0..33_000 {
            source.push_str(&format!("float f{} = 1.0;\n", i));
        }
        source.push_str("f0 = f32999;\n}\n");

        let program = lower(&source);
        let big = routine(&program, "big");

        assert_eq!(big.slot_of("f0"), Some(0));
        assert_eq!(big.slot_of("f32766"), Some(65532));
        assert_eq!(big.slot_of("f32999"), None);
        assert_eq!(big.locals.len(), 32_767);
        assert_eq!(big.check_stack(), Ok(big.max_stack));
    }

    #[test]
    fn test_listing() {
        let program = lower("float f = 1.5;");
        let listing = program.to_string();

        assert!(listing.starts_with("toplevel <main> (max stack 1)"), "{}", listing);
        assert!(listing.contains("local @0 f: float"), "{}", listing);
        assert!(listing.contains("STORE f @0 : float"), "{}", listing);
    }
}
