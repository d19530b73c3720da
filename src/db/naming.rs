//! Table naming.

/// Maps a logical entity name (e.g. `Widget`) to its table name.
pub trait NamingStrategy: Send + Sync + std::fmt::Debug {
    fn table_name(&self, entity: &str) -> String;
}

/// `CamelCase` entity names become pluralized `snake_case` tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultNamingStrategy {
    pub table_prefix: String,
    /// Keep the last word singular.
    pub singular_table: bool,
}

impl DefaultNamingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn singular(mut self) -> Self {
        self.singular_table = true;
        self
    }
}

impl NamingStrategy for DefaultNamingStrategy {
    fn table_name(&self, entity: &str) -> String {
        let snake = to_snake_case(entity);
        let table = if self.singular_table {
            snake
        } else {
            pluralize(&snake)
        };
        format!("{}{}", self.table_prefix, table)
    }
}

/// `UserRole` -> `user_role`, `HTTPRequest` -> `http_request`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None => false,
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // End of an acronym: "HTTPRequest" splits before "Request".
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// English plural of the last `_`-separated word.
pub fn pluralize(word: &str) -> String {
    let (head, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };
    if last.is_empty() {
        return word.to_string();
    }

    let plural = match last {
        "person" => "people".to_string(),
        "child" => "children".to_string(),
        "data" | "info" | "metadata" | "news" | "series" => last.to_string(),
        _ if last.ends_with('s')
            || last.ends_with('x')
            || last.ends_with("ch")
            || last.ends_with("sh")
            || last.ends_with('z') =>
        {
            format!("{}es", last)
        }
        _ if last.ends_with('y') && !ends_with_vowel_y(last) => {
            format!("{}ies", &last[..last.len() - 1])
        }
        _ => format!("{}s", last),
    };
    format!("{}{}", head, plural)
}

fn ends_with_vowel_y(word: &str) -> bool {
    let mut rev = word.chars().rev();
    rev.next();
    matches!(rev.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}
