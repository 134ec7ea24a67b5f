use crate::model::{ATTR_IP, ATTR_NAME};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anonymizer {
    enabled: bool,
}

impl Anonymizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn host_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if !self.enabled || name.is_empty() {
            return Cow::Borrowed(name);
        }
        Cow::Owned(format!("host-{}", digest_prefix(name)))
    }

    pub fn filename<'a>(&self, filename: &'a str) -> Cow<'a, str> {
        if !self.enabled || filename.is_empty() {
            return Cow::Borrowed(filename);
        }
        Cow::Owned(format!("file-{}", digest_prefix(filename)))
    }

    pub fn hides_attribute(&self, key: &str) -> bool {
        self.enabled && (key == ATTR_NAME || key == ATTR_IP)
    }
}

fn digest_prefix(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..4].iter().map(|byte| format!("{byte:02x}")).collect()
}
