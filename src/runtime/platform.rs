//! Host platform detection and tool resolution

use std::fmt;

use crate::parser::ast::{PlatformKey, ToolOption};

/// Operating system and architecture labels the engine matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl AsRef<str>, arch: impl AsRef<str>) -> Self {
        Self {
            os: normalize_os(os.as_ref()),
            arch: normalize_arch(arch.as_ref()),
        }
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// `plat NAME` test; `unix` covers every non-Windows OS.
    pub fn matches_plat(&self, selector: &str) -> bool {
        normalize_os(selector) == self.os || (selector == "unix" && !self.is_windows())
    }

    /// `arch NAME` test
    pub fn matches_arch(&self, selector: &str) -> bool {
        normalize_arch(selector) == self.arch
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

pub fn normalize_os(raw: &str) -> String {
    match raw {
        "windows" | "win32" | "win64" => "windows".to_string(),
        "darwin" => "macos".to_string(),
        other => other.to_string(),
    }
}

pub fn normalize_arch(raw: &str) -> String {
    match raw {
        "x86_64" | "amd64" => "x64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// How well `option` fits `platform`; 0 means it does not apply.
pub fn score(option: &ToolOption, platform: &Platform) -> f64 {
    let arch = option.arch.as_deref();
    let arch_exact = arch.map(normalize_arch).as_deref() == Some(platform.arch.as_str());
    let os_exact = |os: &str| normalize_os(os) == platform.os;

    match (&option.platform, arch) {
        (PlatformKey::Named(os), None) if os_exact(os.as_str()) => 2.0,
        (PlatformKey::Named(os), Some(_)) if os_exact(os.as_str()) && arch_exact => 3.0,
        (PlatformKey::Any, None) => 1.0,
        (PlatformKey::Any, Some(_)) if arch_exact => 2.0,
        (PlatformKey::Unix, None) if !platform.is_windows() => 1.5,
        (PlatformKey::Unix, Some(_)) if !platform.is_windows() && arch_exact => 2.5,
        _ => 0.0,
    }
}

/// Pick the best option for `platform`. Ties go to the earlier declaration.
pub fn resolve<'a>(options: &'a [ToolOption], platform: &Platform) -> Option<(&'a ToolOption, f64)> {
    let mut best: Option<(&ToolOption, f64)> = None;
    let mut best_score = 0.0;

    for option in options {
        let score = score(option, platform);
        if score > best_score {
            best_score = score;
            best = Some((option, score));
        }
    }

    best
}
