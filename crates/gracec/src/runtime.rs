//! The Grace runtime library surface.
//!
//! Everything the compiler knows about the runtime lives here: the symbol
//! names, the Grace-level signatures used to seed the outermost semantic
//! scope, and (via `CodeGen::declare_runtime`) the LLVM declarations added
//! to every emitted module. The runtime itself is linked in separately; the
//! module only imports these symbols, and no static link is passed to them.

use grace_ast::{DataType, FparType, RetType};

use crate::types::FparGroup;

/// Runtime symbol names as they appear in the emitted IR.
pub mod names {
    pub const WRITE_INTEGER: &str = "writeInteger";
    pub const WRITE_CHAR: &str = "writeChar";
    pub const WRITE_STRING: &str = "writeString";
    pub const READ_INTEGER: &str = "readInteger";
    pub const READ_CHAR: &str = "readChar";
    pub const READ_STRING: &str = "readString";
    pub const ASCII: &str = "ascii";
    pub const CHR: &str = "chr";
    pub const STRLEN: &str = "strlen";
    pub const STRCMP: &str = "strcmp";
    pub const STRCPY: &str = "strcpy";
    pub const STRCAT: &str = "strcat";
}

/// One runtime function: name, return type and condensed parameter groups.
pub struct RuntimeFn {
    pub name: &'static str,
    pub ret: RetType,
    pub params: Vec<FparGroup>,
}

fn by_value(data: DataType, count: usize) -> FparGroup {
    FparGroup { fpar: FparType::scalar(data), count, by_ref: false }
}

fn string_ref(count: usize) -> FparGroup {
    FparGroup {
        fpar: FparType { data: DataType::Char, unknown_first: true, dims: Vec::new() },
        count,
        by_ref: true,
    }
}

/// The full runtime library in registration order.
pub fn library() -> Vec<RuntimeFn> {
    use DataType::{Char, Int};
    use RetType::{Data, Nothing};

    vec![
        RuntimeFn {
            name: names::WRITE_INTEGER,
            ret: Nothing,
            params: vec![by_value(Int, 1)],
        },
        RuntimeFn {
            name: names::WRITE_CHAR,
            ret: Nothing,
            params: vec![by_value(Char, 1)],
        },
        RuntimeFn {
            name: names::WRITE_STRING,
            ret: Nothing,
            params: vec![string_ref(1)],
        },
        RuntimeFn { name: names::READ_INTEGER, ret: Data(Int), params: Vec::new() },
        RuntimeFn { name: names::READ_CHAR, ret: Data(Char), params: Vec::new() },
        RuntimeFn {
            name: names::READ_STRING,
            ret: Nothing,
            params: vec![by_value(Int, 1), string_ref(1)],
        },
        RuntimeFn {
            name: names::ASCII,
            ret: Data(Int),
            params: vec![by_value(Char, 1)],
        },
        RuntimeFn {
            name: names::CHR,
            ret: Data(Char),
            params: vec![by_value(Int, 1)],
        },
        RuntimeFn {
            name: names::STRLEN,
            ret: Data(Int),
            params: vec![string_ref(1)],
        },
        RuntimeFn {
            name: names::STRCMP,
            ret: Data(Int),
            params: vec![string_ref(2)],
        },
        RuntimeFn {
            name: names::STRCPY,
            ret: Nothing,
            params: vec![string_ref(2)],
        },
        RuntimeFn {
            name: names::STRCAT,
            ret: Nothing,
            params: vec![string_ref(2)],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_order_and_arities() {
        let lib = library();
        assert_eq!(lib.len(), 12);
        assert_eq!(lib[0].name, "writeInteger");
        assert_eq!(lib[11].name, "strcat");

        let strcmp = lib.iter().find(|f| f.name == "strcmp").unwrap();
        // two strings condensed into a single group
        assert_eq!(strcmp.params.len(), 1);
        assert_eq!(strcmp.params[0].count, 2);
        assert!(strcmp.params[0].by_ref);
        assert!(strcmp.params[0].fpar.unknown_first);
    }
}
