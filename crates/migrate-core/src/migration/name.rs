use chrono::NaiveDateTime;

/// Format of the version prefix in `<timestamp>_<name>.sql`.
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

const VERSION_LEN: usize = 14;

/// A migration file name split into its conventional parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationName {
    file_name: String,
    version: Option<String>,
    label: String,
}

impl MigrationName {
    /// Split a file name such as `20240101000000_init.sql`.
    ///
    /// Names that do not follow the convention still parse; they just have no
    /// version.
    pub fn parse(file_name: &str) -> Self {
        let stem = file_name.strip_suffix(".sql").unwrap_or(file_name);

        let (version, label) = match stem.split_once('_') {
            Some((prefix, rest)) if is_version(prefix) && !rest.is_empty() => {
                (Some(prefix.to_string()), rest.to_string())
            }
            _ => (None, stem.to_string()),
        };

        Self {
            file_name: file_name.to_string(),
            version,
            label,
        }
    }

    /// File name for a new migration created at `now`.
    pub fn for_new(now: NaiveDateTime, label: &str) -> String {
        format!("{}_{}.sql", now.format(VERSION_FORMAT), label)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the name follows `<14-digit-timestamp>_<name>.sql`.
    pub fn is_conventional(&self) -> bool {
        self.version.is_some() && self.file_name.ends_with(".sql")
    }

    /// The version prefix read as a timestamp.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.version
            .as_deref()
            .and_then(|v| NaiveDateTime::parse_from_str(v, VERSION_FORMAT).ok())
    }
}

fn is_version(prefix: &str) -> bool {
    prefix.len() == VERSION_LEN && prefix.bytes().all(|b| b.is_ascii_digit())
}
