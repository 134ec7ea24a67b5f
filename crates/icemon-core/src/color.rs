use serde::{Deserialize, Serialize};

pub const HOST_PALETTE_LEN: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorId(pub usize);

impl ColorId {
    pub const DEFAULT: Self = Self(0);

    pub fn is_default(self) -> bool {
        self.0 == 0
    }
}

pub fn host_color(name: &str) -> ColorId {
    if name.is_empty() {
        return ColorId::DEFAULT;
    }
    let index = (stable_hash(name) % HOST_PALETTE_LEN as u64) as usize;
    ColorId(index + 1)
}

fn stable_hash(input: &str) -> u64 {
    let mut hash: u64 = 1469598103934665603;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_color_is_stable_and_in_palette() {
        let first = host_color("builder-7");
        assert_eq!(first, host_color("builder-7"));
        assert!(first.0 >= 1 && first.0 <= HOST_PALETTE_LEN);
    }

    #[test]
    fn unnamed_host_uses_default_color() {
        assert!(host_color("").is_default());
    }
}
