//! Source fragment normalization: docstring elision and whitespace collapse.
//!
//! A small character-stream scanner, deliberately not a reader: everything
//! downstream of a definition head is preserved token-for-token so quoting
//! variants cannot perturb the hash. The scanner only understands enough
//! syntax to find docstrings — string literals with backslash escapes, and
//! the argument vector a docstring may follow.

/// Normalize a source fragment: strip docstrings, then collapse every run of
/// whitespace to a single space and trim the ends.
pub fn normalize(fragment: &str) -> String {
    let stripped = strip_docstrings(fragment);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Elide docstrings from every `def*` form in the fragment.
///
/// A docstring is a string literal immediately after the defined name, or
/// immediately after the argument vector that follows the name. All other
/// text passes through unchanged.
fn strip_docstrings(fragment: &str) -> String {
    let chars: Vec<char> = fragment.chars().collect();
    let mut out = String::with_capacity(fragment.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            // A string literal outside any def head: copy verbatim
            i = copy_string(&chars, i, &mut out);
        } else if c == '(' {
            out.push(c);
            i += 1;
            // Identifier directly after the paren
            let ident_start = i;
            while i < chars.len() && is_symbol_char(chars[i]) {
                out.push(chars[i]);
                i += 1;
            }
            let ident: String = chars[ident_start..i].iter().collect();
            if ident.starts_with("def") {
                i = elide_after_head(&chars, i, &mut out);
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// After a `def*` head: emit the name token, then elide a docstring in either
/// valid position. Returns the position to resume the main scan from.
fn elide_after_head(chars: &[char], mut i: usize, out: &mut String) -> usize {
    i = copy_whitespace(chars, i, out);

    // Name token
    while i < chars.len() && is_symbol_char(chars[i]) {
        out.push(chars[i]);
        i += 1;
    }

    i = copy_whitespace(chars, i, out);
    if i >= chars.len() {
        return i;
    }

    if chars[i] == '"' {
        // Docstring in name position
        return skip_string(chars, i);
    }

    if chars[i] == '[' {
        // Argument vector, then possibly a docstring
        i = copy_balanced_vector(chars, i, out);
        i = copy_whitespace(chars, i, out);
        if i < chars.len() && chars[i] == '"' {
            return skip_string(chars, i);
        }
    }
    i
}

/// Copy a string literal (including quotes) to the output. `i` points at the
/// opening quote; returns the index past the closing quote.
fn copy_string(chars: &[char], mut i: usize, out: &mut String) -> usize {
    out.push(chars[i]);
    i += 1;
    let mut escaped = false;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            break;
        }
    }
    i
}

/// Skip a string literal without emitting it. Same contract as [`copy_string`].
fn skip_string(chars: &[char], mut i: usize) -> usize {
    i += 1;
    let mut escaped = false;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            break;
        }
    }
    i
}

/// Copy a `[...]` form, tracking bracket depth with string awareness.
fn copy_balanced_vector(chars: &[char], mut i: usize, out: &mut String) -> usize {
    let mut depth = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            i = copy_string(chars, i, out);
            continue;
        }
        out.push(c);
        i += 1;
        if c == '[' {
            depth += 1;
        } else if c == ']' {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
    }
    i
}

fn copy_whitespace(chars: &[char], mut i: usize, out: &mut String) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        out.push(chars[i]);
        i += 1;
    }
    i
}

/// Characters that can constitute a Clojure symbol token, for the purpose of
/// finding where a head or name token ends.
fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | ',')
}
