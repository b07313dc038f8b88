/// Symbol as it appears in a planning domain or problem: predicate, object,
/// type or variable name. Canonicalized to lower case by the reader.
pub type Sym = arcstr::ArcStr;

/// A planning domain or problem source, as read from a file or an in-memory string.
pub struct Input {
    pub text: String,
}

impl Input {
    pub fn from_string(input: impl Into<String>) -> Input {
        Input { text: input.into() }
    }

    pub fn from_file(file: &std::path::Path) -> std::result::Result<Input, std::io::Error> {
        let text = std::fs::read_to_string(file)?;
        Ok(Input { text })
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input { text: s.to_string() }
    }
}
