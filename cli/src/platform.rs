use std::env;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum OS {
    Linux,
    Macos,
    Windows,
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Other(String),
}

impl OS {
    pub fn as_str(&self) -> &str {
        match self {
            OS::Linux => "linux",
            OS::Macos => "macos",
            OS::Windows => "windows",
            OS::Other(name) => name,
        }
    }
}

impl Arch {
    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Other(name) => name,
        }
    }
}

/// Host description included in debug reports.
#[derive(Debug, Clone)]
pub struct Platform {
    pub os: OS,
    pub arch: Arch,
}

impl Platform {
    /// Never fails: unrecognised hosts are reported as `Other`.
    pub fn detect() -> Self {
        let os = match env::consts::OS {
            "linux" => OS::Linux,
            "macos" => OS::Macos,
            "windows" => OS::Windows,
            other => OS::Other(other.to_string()),
        };

        let arch = match env::consts::ARCH {
            "x86_64" => Arch::X86_64,
            "aarch64" | "arm64" => Arch::Aarch64,
            other => Arch::Other(other.to_string()),
        };

        Platform { os, arch }
    }

    pub fn target_triple(&self) -> Option<&'static str> {
        let triple = match (&self.os, &self.arch) {
            (OS::Linux, Arch::X86_64) => "x86_64-unknown-linux-gnu",
            (OS::Linux, Arch::Aarch64) => "aarch64-unknown-linux-gnu",
            (OS::Macos, Arch::X86_64) => "x86_64-apple-darwin",
            (OS::Macos, Arch::Aarch64) => "aarch64-apple-darwin",
            (OS::Windows, Arch::X86_64) => "x86_64-pc-windows-msvc",
            (OS::Windows, Arch::Aarch64) => "aarch64-pc-windows-msvc",
            _ => return None,
        };
        Some(triple)
    }

    /// `os`, `arch` and `triple` as a JSON object.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "os": self.os.as_str(),
            "arch": self.arch.as_str(),
            "triple": self.target_triple(),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_triple() {
            Some(triple) => f.write_str(triple),
            None => write!(f, "{}-{}", self.arch.as_str(), self.os.as_str()),
        }
    }
}
