use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolves a dotted/bracketed key path against a document.
///
/// `a.b[0].c`, `a[b][0][c]` and `a/b/0/c` all address the same node. Bracket
/// segments may name object keys as well as array indices. Resolution stops
/// with `None` at the first missing segment or non-indexable value. An empty
/// path resolves to the document itself.
#[must_use]
pub fn resolve<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = document;
    for seg in parts(path) {
        cur = step(cur, &seg).ok()?;
    }
    Some(cur)
}

/// Splits a path into plain segments, normalizing `[x]` to `x`.
fn parts(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' | '/' => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            '[' => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if closed {
                    if !inner.is_empty() {
                        out.push(inner);
                    }
                } else {
                    // Unterminated bracket: keep the remainder as a literal key.
                    buf.push('[');
                    buf.push_str(&inner);
                }
            }
            _ => buf.push(ch),
        }
    }

    if !buf.is_empty() {
        out.push(buf);
    }

    out
}

fn step<'a>(cur: &'a Value, seg: &str) -> Result<&'a Value, String> {
    match cur {
        Value::Array(arr) => {
            let idx = seg
                .parse::<usize>()
                .map_err(|_| format!("Expected list index at segment '{seg}'"))?;
            arr.get(idx)
                .ok_or_else(|| format!("Index out of range at segment '{seg}'"))
        }
        Value::Object(map) => map
            .get(seg)
            .ok_or_else(|| format!("Path not found at segment '{seg}', see available fields")),
        other => Err(format!(
            "Cannot descend into {} at segment '{seg}'",
            crate::shape::ValueType::of(other)
        )),
    }
}

/// Resolution report: the resolved value, or why and where resolution
/// stopped together with the fields available at that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPathResolver {
    pub content: Value,
    pub path: String,
    pub value: Option<Value>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_fields: Option<Vec<String>>,
}

impl JsonPathResolver {
    #[must_use]
    pub fn new(content: Value) -> Self {
        JsonPathResolver {
            content,
            path: String::new(),
            value: None,
            resolved: false,
            error: None,
            available_fields: None,
        }
    }

    fn list_available(node: &Value, prefix: &str, out: &mut Vec<String>) {
        match node {
            Value::Object(map) => {
                for (k, v) in map {
                    let p = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    out.push(p.clone());
                    if v.is_object() || v.is_array() {
                        Self::list_available(v, &p, out);
                    }
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter().enumerate() {
                    let p = format!("{prefix}[{i}]");
                    out.push(p.clone());
                    if v.is_object() || v.is_array() {
                        Self::list_available(v, &p, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn collect_from(node: &Value) -> Vec<String> {
        let mut acc = Vec::new();
        Self::list_available(node, "", &mut acc);
        acc
    }

    #[must_use]
    pub fn resolve(mut self, path: &str) -> Self {
        path.clone_into(&mut self.path);
        self.value = None;
        self.resolved = false;
        self.error = None;
        self.available_fields = None;

        let outcome = {
            let mut cur = &self.content;
            let mut failure = None;
            for seg in parts(path) {
                match step(cur, &seg) {
                    Ok(next) => cur = next,
                    Err(e) => {
                        failure = Some((e, Self::collect_from(cur)));
                        break;
                    }
                }
            }
            match failure {
                Some(f) => Err(f),
                None => Ok(cur.clone()),
            }
        };

        match outcome {
            Ok(value) => {
                self.value = Some(value);
                self.resolved = true;
            }
            Err((error, available)) => {
                self.error = Some(error);
                self.available_fields = Some(available);
            }
        }
        self
    }
}
