//! The 32-bit per-byte flag word.
//!
//! Every byte of the disassembled program carries one 32-bit flag word in
//! the id1 section. The low 8 bits hold the byte value (when the
//! "has value" bit is set); the upper bits partition into tagged fields:
//!
//! | Field      | Mask         | Meaning                                    |
//! |------------|--------------|--------------------------------------------|
//! | `MS_VAL`   | `0x000000FF` | byte value, when `FF_IVL` is set           |
//! | `FF_IVL`   | `0x00000100` | byte has a value                           |
//! | `MS_CLS`   | `0x00000600` | class: code / data / tail / unknown        |
//! | `MS_COMM`  | `0x000FF800` | comment, name, flow, reference, ... bits   |
//! | `MS_0TYPE` | `0x00F00000` | operand 0 representation                   |
//! | `MS_1TYPE` | `0x0F000000` | operand 1 representation                   |
//! | `MS_CODE`  | `0xF0000000` | code subtype, when the class is code       |
//! | `DT_TYPE`  | `0xF0000000` | data type, when the class is data          |
//!
//! [`Flags`] wraps one word and exposes a predicate per tagged value:
//! field predicates are mask-and-compare, the `MS_COMM` members and
//! `FF_IVL` are bit tests. A byte is a "head" when its class is code or
//! data, i.e. it starts an instruction or data item; "tail" bytes continue
//! one.

// ── Byte value ──────────────────────────────────────────────────────

/// Mask for the stored byte value.
pub const MS_VAL: u32 = 0x0000_00FF;
/// Byte has a value.
pub const FF_IVL: u32 = 0x0000_0100;

// ── Class ───────────────────────────────────────────────────────────

/// Mask for the byte class.
pub const MS_CLS: u32 = 0x0000_0600;
/// Start of an instruction.
pub const FF_CODE: u32 = 0x0000_0600;
/// Start of a data item.
pub const FF_DATA: u32 = 0x0000_0400;
/// Continuation of the preceding instruction or data item.
pub const FF_TAIL: u32 = 0x0000_0200;
/// Unexplored byte.
pub const FF_UNK: u32 = 0x0000_0000;

// ── Common state bits ───────────────────────────────────────────────

/// Mask of the common state bits.
pub const MS_COMM: u32 = 0x000F_F800;
/// Has a comment.
pub const FF_COMM: u32 = 0x0000_0800;
/// Has cross-references.
pub const FF_REF: u32 = 0x0000_1000;
/// Has extra (anterior or posterior) lines.
pub const FF_LINE: u32 = 0x0000_2000;
/// Has a user-given name.
pub const FF_NAME: u32 = 0x0000_4000;
/// Has a dummy (auto-generated) name.
pub const FF_LABL: u32 = 0x0000_8000;
/// Execution flows in from the previous instruction.
pub const FF_FLOW: u32 = 0x0001_0000;
/// Operand signs are inverted.
pub const FF_SIGN: u32 = 0x0002_0000;
/// Operands are bitwise negated.
pub const FF_BNOT: u32 = 0x0004_0000;
/// Variable byte.
pub const FF_VAR: u32 = 0x0008_0000;

// ── Operand representation ──────────────────────────────────────────

/// Mask for the operand-0 representation.
pub const MS_0TYPE: u32 = 0x00F0_0000;
/// Mask for the operand-1 representation.
pub const MS_1TYPE: u32 = 0x0F00_0000;

/// Operand representation sub-types, shifted into `MS_0TYPE` (shift 20)
/// or `MS_1TYPE` (shift 24).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OperandType {
    /// No defined representation.
    Void = 0x0,
    /// Hexadecimal number.
    NumHex = 0x1,
    /// Decimal number.
    NumDec = 0x2,
    /// Character constant.
    Char = 0x3,
    /// Segment selector.
    Seg = 0x4,
    /// Offset.
    Off = 0x5,
    /// Binary number.
    NumBin = 0x6,
    /// Octal number.
    NumOct = 0x7,
    /// Enumeration member.
    Enum = 0x8,
    /// Forced operand.
    Forced = 0x9,
    /// Struct offset.
    StructOff = 0xA,
    /// Stack variable.
    StackVar = 0xB,
    /// Floating point number.
    Float = 0xC,
    /// Custom representation.
    Custom = 0xD,
}

const OP0_SHIFT: u32 = 20;
const OP1_SHIFT: u32 = 24;

// ── Code subtype / data type (shared field) ─────────────────────────

/// Mask for the code subtype, when the class is code.
pub const MS_CODE: u32 = 0xF000_0000;
/// Function start.
pub const FF_FUNC: u32 = 0x1000_0000;
/// Has an immediate value.
pub const FF_IMMD: u32 = 0x4000_0000;
/// Has a jump table or switch info.
pub const FF_JUMP: u32 = 0x8000_0000;

/// Mask for the data type, when the class is data.
pub const DT_TYPE: u32 = 0xF000_0000;
/// Byte.
pub const FF_BYTE: u32 = 0x0000_0000;
/// Word (2 bytes).
pub const FF_WORD: u32 = 0x1000_0000;
/// Double word (4 bytes).
pub const FF_DWRD: u32 = 0x2000_0000;
/// Quad word (8 bytes).
pub const FF_QWRD: u32 = 0x3000_0000;
/// Ten-byte value.
pub const FF_TBYT: u32 = 0x4000_0000;
/// ASCII string.
pub const FF_ASCI: u32 = 0x5000_0000;
/// Struct instance.
pub const FF_STRU: u32 = 0x6000_0000;
/// Octa word (16 bytes).
pub const FF_OWRD: u32 = 0x7000_0000;
/// Float (4 bytes).
pub const FF_FLOAT: u32 = 0x8000_0000;
/// Double (8 bytes).
pub const FF_DOUBLE: u32 = 0x9000_0000;
/// Packed decimal real.
pub const FF_PACKREAL: u32 = 0xA000_0000;
/// Alignment directive.
pub const FF_ALIGN: u32 = 0xB000_0000;
/// Three-byte data.
pub const FF_3BYTE: u32 = 0xC000_0000;
/// Custom data type.
pub const FF_CUSTOM: u32 = 0xD000_0000;
/// Ymm word (32 bytes).
pub const FF_YWRD: u32 = 0xE000_0000;

/// One 32-bit flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(pub u32);

impl Flags {
    /// The raw word.
    pub fn raw(self) -> u32 {
        self.0
    }

    // ── Byte value ──────────────────────────────────────────────────

    /// Whether the byte has a stored value.
    pub fn has_value(self) -> bool {
        self.0 & FF_IVL != 0
    }

    /// The stored byte value, when present.
    pub fn byte_value(self) -> Option<u8> {
        if self.has_value() {
            Some((self.0 & MS_VAL) as u8)
        } else {
            None
        }
    }

    // ── Class ───────────────────────────────────────────────────────

    /// Start of an instruction?
    pub fn is_code(self) -> bool {
        self.0 & MS_CLS == FF_CODE
    }

    /// Start of a data item?
    pub fn is_data(self) -> bool {
        self.0 & MS_CLS == FF_DATA
    }

    /// Continuation byte of an instruction or data item?
    pub fn is_tail(self) -> bool {
        self.0 & MS_CLS == FF_TAIL
    }

    /// Anything but a continuation byte?
    pub fn is_not_tail(self) -> bool {
        !self.is_tail()
    }

    /// Unexplored byte?
    pub fn is_unknown(self) -> bool {
        self.0 & MS_CLS == FF_UNK
    }

    /// Start of an instruction or data item?
    pub fn is_head(self) -> bool {
        self.is_code() || self.is_data()
    }

    // ── Common state bits ───────────────────────────────────────────

    /// Has a comment?
    pub fn has_comment(self) -> bool {
        self.0 & MS_COMM & FF_COMM != 0
    }

    /// Has cross-references?
    pub fn has_reference(self) -> bool {
        self.0 & MS_COMM & FF_REF != 0
    }

    /// Has extra (anterior or posterior) lines?
    pub fn has_extra_lines(self) -> bool {
        self.0 & MS_COMM & FF_LINE != 0
    }

    /// Has a user-given name?
    pub fn has_name(self) -> bool {
        self.0 & MS_COMM & FF_NAME != 0
    }

    /// Has a dummy (auto-generated) name?
    pub fn has_dummy_name(self) -> bool {
        self.0 & MS_COMM & FF_LABL != 0
    }

    /// Does execution flow in from the previous instruction?
    pub fn is_flow(self) -> bool {
        self.0 & MS_COMM & FF_FLOW != 0
    }

    /// Inverted operand signs?
    pub fn is_inverted_sign(self) -> bool {
        self.0 & MS_COMM & FF_SIGN != 0
    }

    /// Bitwise-negated operands?
    pub fn is_bitwise_negated(self) -> bool {
        self.0 & MS_COMM & FF_BNOT != 0
    }

    /// Variable byte?
    pub fn is_var(self) -> bool {
        self.0 & MS_COMM & FF_VAR != 0
    }

    // ── Code subtypes (class must be code) ──────────────────────────

    /// Function start?
    pub fn is_func(self) -> bool {
        self.0 & MS_CODE == FF_FUNC
    }

    /// Has an immediate value?
    pub fn is_immd(self) -> bool {
        self.0 & MS_CODE == FF_IMMD
    }

    /// Has a jump table or switch info?
    pub fn is_jump(self) -> bool {
        self.0 & MS_CODE == FF_JUMP
    }

    // ── Data types (class must be data) ─────────────────────────────

    /// Byte data?
    pub fn is_byte(self) -> bool {
        self.0 & DT_TYPE == FF_BYTE
    }

    /// Word data?
    pub fn is_word(self) -> bool {
        self.0 & DT_TYPE == FF_WORD
    }

    /// Double-word data?
    pub fn is_dword(self) -> bool {
        self.0 & DT_TYPE == FF_DWRD
    }

    /// Quad-word data?
    pub fn is_qword(self) -> bool {
        self.0 & DT_TYPE == FF_QWRD
    }

    /// Octa-word data?
    pub fn is_oword(self) -> bool {
        self.0 & DT_TYPE == FF_OWRD
    }

    /// Ymm-word data?
    pub fn is_yword(self) -> bool {
        self.0 & DT_TYPE == FF_YWRD
    }

    /// Ten-byte data?
    pub fn is_tbyte(self) -> bool {
        self.0 & DT_TYPE == FF_TBYT
    }

    /// ASCII string data?
    pub fn is_ascii(self) -> bool {
        self.0 & DT_TYPE == FF_ASCI
    }

    /// Struct instance?
    pub fn is_struct(self) -> bool {
        self.0 & DT_TYPE == FF_STRU
    }

    /// Float data?
    pub fn is_float(self) -> bool {
        self.0 & DT_TYPE == FF_FLOAT
    }

    /// Double data?
    pub fn is_double(self) -> bool {
        self.0 & DT_TYPE == FF_DOUBLE
    }

    /// Packed decimal real?
    pub fn is_packed_real(self) -> bool {
        self.0 & DT_TYPE == FF_PACKREAL
    }

    /// Alignment directive?
    pub fn is_align(self) -> bool {
        self.0 & DT_TYPE == FF_ALIGN
    }

    /// Three-byte data?
    pub fn is_3byte(self) -> bool {
        self.0 & DT_TYPE == FF_3BYTE
    }

    /// Custom data type?
    pub fn is_custom(self) -> bool {
        self.0 & DT_TYPE == FF_CUSTOM
    }

    // ── Operand representations ─────────────────────────────────────

    /// Raw operand-0 representation field.
    pub fn operand0_type(self) -> u32 {
        self.0 & MS_0TYPE
    }

    /// Raw operand-1 representation field.
    pub fn operand1_type(self) -> u32 {
        self.0 & MS_1TYPE
    }

    /// Is operand 0 tagged with the given representation?
    pub fn is_operand0(self, op: OperandType) -> bool {
        self.operand0_type() == (op as u32) << OP0_SHIFT
    }

    /// Is operand 1 tagged with the given representation?
    pub fn is_operand1(self, op: OperandType) -> bool {
        self.operand1_type() == (op as u32) << OP1_SHIFT
    }

    /// Does operand 0 have a defined representation?
    pub fn is_defined_operand0(self) -> bool {
        self.operand0_type() != 0
    }

    /// Does operand 1 have a defined representation?
    pub fn is_defined_operand1(self) -> bool {
        self.operand1_type() != 0
    }

    /// Is operand 0 an offset?
    pub fn is_off0(self) -> bool {
        self.is_operand0(OperandType::Off)
    }

    /// Is operand 1 an offset?
    pub fn is_off1(self) -> bool {
        self.is_operand1(OperandType::Off)
    }

    /// Is operand 0 a character constant?
    pub fn is_char0(self) -> bool {
        self.is_operand0(OperandType::Char)
    }

    /// Is operand 1 a character constant?
    pub fn is_char1(self) -> bool {
        self.is_operand1(OperandType::Char)
    }

    /// Is operand 0 a segment selector?
    pub fn is_seg0(self) -> bool {
        self.is_operand0(OperandType::Seg)
    }

    /// Is operand 1 a segment selector?
    pub fn is_seg1(self) -> bool {
        self.is_operand1(OperandType::Seg)
    }

    /// Is operand 0 an enumeration member?
    pub fn is_enum0(self) -> bool {
        self.is_operand0(OperandType::Enum)
    }

    /// Is operand 1 an enumeration member?
    pub fn is_enum1(self) -> bool {
        self.is_operand1(OperandType::Enum)
    }

    /// Is operand 0 a struct offset?
    pub fn is_stroff0(self) -> bool {
        self.is_operand0(OperandType::StructOff)
    }

    /// Is operand 1 a struct offset?
    pub fn is_stroff1(self) -> bool {
        self.is_operand1(OperandType::StructOff)
    }

    /// Is operand 0 a stack variable?
    pub fn is_stkvar0(self) -> bool {
        self.is_operand0(OperandType::StackVar)
    }

    /// Is operand 1 a stack variable?
    pub fn is_stkvar1(self) -> bool {
        self.is_operand1(OperandType::StackVar)
    }

    /// Is operand 0 a floating point number?
    pub fn is_float0(self) -> bool {
        self.is_operand0(OperandType::Float)
    }

    /// Is operand 1 a floating point number?
    pub fn is_float1(self) -> bool {
        self.is_operand1(OperandType::Float)
    }

    /// Does operand 0 use a custom representation?
    pub fn is_custom_format0(self) -> bool {
        self.is_operand0(OperandType::Custom)
    }

    /// Does operand 1 use a custom representation?
    pub fn is_custom_format1(self) -> bool {
        self.is_operand1(OperandType::Custom)
    }

    /// Is operand 0 a number (binary, octal, decimal, or hex)?
    pub fn is_num0(self) -> bool {
        self.is_operand0(OperandType::NumBin)
            || self.is_operand0(OperandType::NumOct)
            || self.is_operand0(OperandType::NumDec)
            || self.is_operand0(OperandType::NumHex)
    }

    /// Is operand 1 a number (binary, octal, decimal, or hex)?
    pub fn is_num1(self) -> bool {
        self.is_operand1(OperandType::NumBin)
            || self.is_operand1(OperandType::NumOct)
            || self.is_operand1(OperandType::NumDec)
            || self.is_operand1(OperandType::NumHex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_value_gated_on_ivl() {
        assert_eq!(Flags(FF_IVL | 0x4A).byte_value(), Some(0x4A));
        assert_eq!(Flags(0x4A).byte_value(), None);
    }

    #[test]
    fn test_class_predicates_are_exclusive() {
        let code = Flags(FF_CODE);
        assert!(code.is_code() && !code.is_data() && !code.is_tail());
        assert!(code.is_head() && code.is_not_tail());

        let data = Flags(FF_DATA);
        assert!(data.is_data() && !data.is_code());
        assert!(data.is_head());

        let tail = Flags(FF_TAIL);
        assert!(tail.is_tail() && !tail.is_head());

        let unk = Flags(FF_UNK);
        assert!(unk.is_unknown() && !unk.is_head());
    }

    #[test]
    fn test_common_bits_are_independent() {
        let f = Flags(FF_COMM | FF_NAME | FF_FLOW);
        assert!(f.has_comment());
        assert!(f.has_name());
        assert!(f.is_flow());
        assert!(!f.has_reference());
        assert!(!f.has_dummy_name());
        assert!(!f.is_var());
    }

    #[test]
    fn test_code_subtypes() {
        let f = Flags(FF_CODE | FF_FUNC);
        assert!(f.is_func() && !f.is_immd() && !f.is_jump());
        assert!(Flags(FF_CODE | FF_JUMP).is_jump());
    }

    #[test]
    fn test_data_types_compare_whole_field() {
        let dword = Flags(FF_DATA | FF_DWRD);
        assert!(dword.is_dword());
        assert!(!dword.is_byte());
        assert!(!dword.is_qword());

        // FF_BYTE is the zero tag: only an all-clear field matches.
        assert!(Flags(FF_DATA).is_byte());
        assert!(!Flags(FF_DATA | FF_YWRD).is_byte());
        assert!(Flags(FF_DATA | FF_YWRD).is_yword());
    }

    #[test]
    fn test_operand_types_per_position() {
        let f = Flags(((OperandType::Off as u32) << 20) | ((OperandType::Char as u32) << 24));
        assert!(f.is_off0() && !f.is_off1());
        assert!(f.is_char1() && !f.is_char0());
        assert!(f.is_defined_operand0() && f.is_defined_operand1());
        assert!(!Flags(0).is_defined_operand0());
    }

    #[test]
    fn test_num_predicates_cover_all_bases() {
        for op in [
            OperandType::NumHex,
            OperandType::NumDec,
            OperandType::NumBin,
            OperandType::NumOct,
        ] {
            assert!(Flags((op as u32) << 20).is_num0());
            assert!(Flags((op as u32) << 24).is_num1());
        }
        assert!(!Flags((OperandType::Char as u32) << 20).is_num0());
    }
}
