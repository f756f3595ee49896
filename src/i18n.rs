//! Label catalogs.
//!
//! Each `Catalog` is built for one explicit `Locale`; there is no global
//! "current language".  Strings come from embedded `key=value` files and fall
//! back to English, then to the key itself.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
    Fr,
}

impl Locale {
    pub fn all() -> &'static [Locale] {
        &[Locale::En, Locale::Es, Locale::Fr]
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Es => "Español",
            Locale::Fr => "Français",
        }
    }

    /// Match a code or system locale string (`fr`, `es-MX`, `en_US.UTF-8`).
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_lowercase().replace('_', "-");
        let lang = normalized.split(['.', '@']).next().unwrap_or(&normalized);
        let primary = lang.split('-').next().unwrap_or(lang);
        Self::all().iter().copied().find(|l| l.code() == primary)
    }

    fn source(self) -> &'static str {
        match self {
            Locale::En => include_str!("../locales/en.txt"),
            Locale::Es => include_str!("../locales/es.txt"),
            Locale::Fr => include_str!("../locales/fr.txt"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Catalog {
    locale: Locale,
    entries: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Catalog {
    pub fn new(locale: Locale) -> Self {
        let fallback = if locale == Locale::En {
            HashMap::new()
        } else {
            parse_translations(Locale::En.source())
        };
        Self {
            locale,
            entries: parse_translations(locale.source()),
            fallback,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn get(&self, key: &str) -> String {
        self.entries
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Look up `key` and substitute `{name}` placeholders.
    pub fn format(&self, key: &str, args: &[(&str, &dyn std::fmt::Display)]) -> String {
        let mut s = self.get(key);
        for (name, val) in args {
            s = s.replace(&format!("{{{}}}", name), &val.to_string());
        }
        s
    }
}

/// `tr!(catalog, "key")` or `tr!(catalog, "key", name = value, ...)`.
#[macro_export]
macro_rules! tr {
    ($cat:expr, $key:expr) => {
        $cat.get($key)
    };
    ($cat:expr, $key:expr, $($name:ident = $val:expr),+ $(,)?) => {
        $cat.format($key, &[$((stringify!($name), &$val as &dyn ::std::fmt::Display)),+])
    };
}

/// One `key=value` per line; `#` starts a comment line.
fn parse_translations(data: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            map.insert(key.trim().to_string(), val.trim().to_string());
        }
    }
    map
}
