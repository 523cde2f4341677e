use core::fmt;

/// Register index type.
pub type RegisterId = u8;

/// A 64-bit ARM register.
///
/// Indices `0..=30` are `x0..x30`, `31` is `sp`, `32` is `zr`, and
/// `33..=64` are the vector registers in their `d` (64-bit scalar) form,
/// the only form AOT-compiled code moves doubles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reg(RegisterId);

impl Reg {
    /// Number of representable registers; usable as a register-file size.
    pub const COUNT: usize = 65;

    /// Frame pointer alias (`x29`).
    pub const FP: Reg = Reg(29);
    /// Link register alias (`x30`).
    pub const LR: Reg = Reg(30);
    /// Stack pointer.
    pub const SP: Reg = Reg(31);
    /// Zero register.
    pub const ZR: Reg = Reg(32);

    /// General register `x<n>`. `n` must be `0..=30`.
    pub const fn x(n: RegisterId) -> Reg {
        assert!(n <= 30);
        Reg(n)
    }

    /// Vector register `d<n>`. `n` must be `0..=31`.
    pub const fn d(n: RegisterId) -> Reg {
        assert!(n <= 31);
        Reg(33 + n)
    }

    /// Flat index into a register file.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is one of `x0..x30`.
    pub const fn is_general(self) -> bool {
        self.0 <= 30
    }

    /// Whether this is a vector register.
    pub const fn is_vector(self) -> bool {
        self.0 >= 33
    }

    /// 32-bit (`w`) rendering, used where the code manipulates the low
    /// half of a general register. Vector registers render unchanged.
    pub fn w_name(self) -> String {
        match self.0 {
            31 => "wsp".to_string(),
            32 => "wzr".to_string(),
            n if n <= 30 => format!("w{n}"),
            n => format!("d{}", n - 33),
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            29 => f.write_str("fp"),
            30 => f.write_str("lr"),
            31 => f.write_str("sp"),
            32 => f.write_str("zr"),
            n if n <= 28 => write!(f, "x{n}"),
            n => write!(f, "d{}", n - 33),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_conventional_aliases() {
        assert_eq!(Reg::x(3).to_string(), "x3");
        assert_eq!(Reg::x(29).to_string(), "fp");
        assert_eq!(Reg::x(30).to_string(), "lr");
        assert_eq!(Reg::SP.to_string(), "sp");
        assert_eq!(Reg::ZR.to_string(), "zr");
        assert_eq!(Reg::d(0).to_string(), "d0");
    }

    #[test]
    fn w_form_rendering() {
        assert_eq!(Reg::x(1).w_name(), "w1");
        assert_eq!(Reg::x(30).w_name(), "w30");
        assert_eq!(Reg::ZR.w_name(), "wzr");
    }

    #[test]
    fn indices_are_disjoint() {
        assert_eq!(Reg::x(0).index(), 0);
        assert_eq!(Reg::SP.index(), 31);
        assert_eq!(Reg::ZR.index(), 32);
        assert_eq!(Reg::d(31).index(), 64);
        assert!(Reg::d(0).index() > Reg::x(30).index());
    }
}
