//! Keyword table served for `pg_get_keywords()`.

/// Keyword category, as reported in `catcode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    /// `U`: usable anywhere.
    Unreserved,
    /// `C`: unreserved, but not as a function or type name.
    ColumnName,
    /// `T`: reserved, but allowed as a function or type name.
    TypeFunctionName,
    /// `R`: reserved.
    Reserved,
}

impl KeywordCategory {
    /// Single-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unreserved => "U",
            Self::ColumnName => "C",
            Self::TypeFunctionName => "T",
            Self::Reserved => "R",
        }
    }

    /// Description as Postgres words it.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Unreserved => "unreserved",
            Self::ColumnName => "unreserved (cannot be function or type name)",
            Self::TypeFunctionName => "reserved (can be function or type name)",
            Self::Reserved => "reserved",
        }
    }
}

/// One row of `pg_get_keywords()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyword {
    /// The keyword.
    pub word: &'static str,
    /// Its category.
    pub category: KeywordCategory,
    /// Whether it can be a column label without `AS`.
    pub bare_label: bool,
}

impl Keyword {
    /// `baredesc` column value.
    #[must_use]
    pub const fn bare_description(&self) -> &'static str {
        if self.bare_label {
            "can be bare label"
        } else {
            "requires AS"
        }
    }
}

const RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
    "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "system_user", "table", "then",
    "to", "trailing", "true", "union", "unique", "user", "using", "variadic", "when", "where",
    "window", "with",
];

const TYPE_FUNCTION_NAME: &[&str] = &[
    "authorization", "binary", "collation", "concurrently", "cross", "current_schema",
    "freeze", "full", "ilike", "inner", "is", "isnull", "join", "left", "like", "natural",
    "notnull", "outer", "overlaps", "right", "similar", "tablesample", "verbose",
];

const COLUMN_NAME: &[&str] = &[
    "between", "bigint", "bit", "boolean", "char", "character", "coalesce", "dec", "decimal",
    "exists", "extract", "float", "greatest", "grouping", "inout", "int", "integer", "interval",
    "json", "json_array", "json_arrayagg", "json_object", "json_objectagg", "json_scalar",
    "json_serialize", "least", "national", "nchar", "none", "normalize", "nullif", "numeric",
    "out", "overlay", "position", "precision", "real", "row", "setof", "smallint", "substring",
    "time", "timestamp", "treat", "trim", "values", "varchar", "xmlattributes", "xmlconcat",
    "xmlelement", "xmlexists", "xmlforest", "xmlnamespaces", "xmlparse", "xmlpi", "xmlroot",
    "xmlserialize", "xmltable",
];

const UNRESERVED: &[&str] = &[
    "abort", "absolute", "access", "action", "add", "admin", "after", "aggregate", "also",
    "alter", "always", "assertion", "assignment", "at", "attach", "attribute", "backward",
    "before", "begin", "by", "cache", "call", "called", "cascade", "cascaded", "catalog",
    "chain", "characteristics", "checkpoint", "class", "close", "cluster", "columns", "comment",
    "comments", "commit", "committed", "compression", "configuration", "conflict", "connection",
    "constraints", "content", "continue", "conversion", "copy", "cost", "csv", "cube",
    "current", "cursor", "cycle", "data", "database", "day", "deallocate", "declare",
    "defaults", "deferred", "definer", "delete", "delimiter", "delimiters", "depends", "depth",
    "detach", "dictionary", "disable", "discard", "document", "domain", "double", "drop",
    "each", "enable", "encoding", "encrypted", "enum", "escape", "event", "exclude",
    "excluding", "exclusive", "execute", "explain", "expression", "extension", "external",
    "family", "filter", "finalize", "first", "following", "force", "format", "forward",
    "function", "functions", "generated", "global", "granted", "groups", "handler", "header",
    "hold", "hour", "identity", "if", "immediate", "immutable", "implicit", "import",
    "include", "including", "increment", "indent", "index", "indexes", "inherit", "inherits",
    "inline", "input", "insensitive", "insert", "instead", "invoker", "isolation", "key",
    "keys", "label", "language", "large", "last", "leakproof", "level", "listen", "load",
    "local", "location", "lock", "locked", "logged", "mapping", "match", "matched",
    "materialized", "maxvalue", "merge", "method", "minute", "minvalue", "mode", "month",
    "move", "name", "names", "new", "next", "nfc", "nfd", "nfkc", "nfkd", "no", "normalized",
    "nothing", "notify", "nowait", "nulls", "object", "of", "off", "oids", "old", "operator",
    "option", "options", "ordinality", "others", "over", "overriding", "owned", "owner",
    "parallel", "parameter", "parser", "partial", "partition", "passing", "password", "plans",
    "policy", "preceding", "prepare", "prepared", "preserve", "prior", "privileges",
    "procedural", "procedure", "procedures", "program", "publication", "quote", "range",
    "read", "reassign", "recursive", "ref", "referencing", "refresh", "reindex", "relative",
    "release", "rename", "repeatable", "replace", "replica", "reset", "restart", "restrict",
    "return", "returns", "revoke", "role", "rollback", "rollup", "routine", "routines", "rows",
    "rule", "savepoint", "schema", "schemas", "scroll", "search", "second", "security",
    "sequence", "sequences", "serializable", "server", "session", "set", "sets", "share",
    "show", "simple", "skip", "snapshot", "sql", "stable", "standalone", "start", "statement",
    "statistics", "stdin", "stdout", "storage", "stored", "strict", "strip", "subscription",
    "support", "sysid", "system", "tables", "tablespace", "temp", "template", "temporary",
    "text", "ties", "transaction", "transform", "trigger", "truncate", "trusted", "type",
    "types", "uescape", "unbounded", "uncommitted", "unencrypted", "unknown", "unlisten",
    "unlogged", "until", "update", "vacuum", "valid", "validate", "validator", "value",
    "varying", "version", "view", "views", "volatile", "whitespace", "within", "without",
    "work", "wrapper", "write", "xml", "year", "yes", "zone",
];

/// Keywords that need `AS` when used as a column label.
const REQUIRES_AS: &[&str] = &[
    "array", "as", "char", "character", "create", "day", "except", "fetch", "filter", "for",
    "from", "grant", "group", "having", "hour", "into", "intersect", "minute", "month", "order",
    "over", "precision", "returning", "second", "to", "union", "varying", "where", "window",
    "with", "within", "without", "year",
];

/// Returns every keyword, sorted by word.
#[must_use]
pub fn keywords() -> Vec<Keyword> {
    let categories = [
        (RESERVED, KeywordCategory::Reserved),
        (TYPE_FUNCTION_NAME, KeywordCategory::TypeFunctionName),
        (COLUMN_NAME, KeywordCategory::ColumnName),
        (UNRESERVED, KeywordCategory::Unreserved),
    ];
    let mut all: Vec<Keyword> = categories
        .into_iter()
        .flat_map(|(words, category)| {
            words.iter().map(move |word| Keyword {
                word,
                category,
                bare_label: !REQUIRES_AS.contains(word),
            })
        })
        .collect();
    all.sort_by_key(|k| k.word);
    all
}
