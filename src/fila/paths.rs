/*!
 * Path Algorithms
 * POSIX-style join, normalize, resolve and relative over plain strings
 *
 * These functions never touch storage. Resolution needs a base directory,
 * which callers pass explicitly (`*_in` variants) or take from the process.
 */

const SLASH: u8 = b'/';
const DOT: u8 = b'.';

/// Collapse `.`, `..` and duplicate separators in a path without its root
///
/// `..` segments that would climb past the start are kept only when
/// `allow_above_root` is set (relative paths); absolute paths drop them.
fn normalize_segments(path: &str, allow_above_root: bool) -> String {
    let bytes = path.as_bytes();
    let mut res = String::with_capacity(path.len());
    let mut last_segment_length = 0usize;
    let mut last_slash: isize = -1;
    let mut dots: i32 = 0;
    let mut code = 0u8;

    for i in 0..=bytes.len() {
        if i < bytes.len() {
            code = bytes[i];
        } else if code == SLASH {
            break;
        } else {
            code = SLASH;
        }

        let at = i as isize;
        if code == SLASH {
            if last_slash == at - 1 || dots == 1 {
                // empty segment or "."
            } else if dots == 2 {
                let ends_with_parent =
                    res.len() >= 2 && last_segment_length == 2 && res.ends_with("..");

                if !ends_with_parent {
                    if res.len() > 2 {
                        match res.rfind('/') {
                            Some(index) => {
                                res.truncate(index);
                                last_segment_length = match res.rfind('/') {
                                    Some(p) => res.len() - 1 - p,
                                    None => res.len(),
                                };
                            }
                            None => {
                                res.clear();
                                last_segment_length = 0;
                            }
                        }
                        last_slash = at;
                        dots = 0;
                        continue;
                    } else if !res.is_empty() {
                        res.clear();
                        last_segment_length = 0;
                        last_slash = at;
                        dots = 0;
                        continue;
                    }
                }

                if allow_above_root {
                    if res.is_empty() {
                        res.push_str("..");
                    } else {
                        res.push_str("/..");
                    }
                    last_segment_length = 2;
                }
            } else {
                let start = (last_slash + 1) as usize;
                if !res.is_empty() {
                    res.push('/');
                }
                res.push_str(&path[start..i]);
                last_segment_length = i - start;
            }
            last_slash = at;
            dots = 0;
        } else if code == DOT && dots != -1 {
            dots += 1;
        } else {
            dots = -1;
        }
    }

    res
}

/// Normalize a path
///
/// Returns `"."` for an empty result, keeps a trailing separator when the
/// input had one, and never climbs above the root of an absolute path.
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let is_absolute = path.as_bytes()[0] == SLASH;
    let trailing_separator = path.as_bytes()[path.len() - 1] == SLASH;

    let mut normalized = normalize_segments(path, !is_absolute);
    if normalized.is_empty() && !is_absolute {
        normalized.push('.');
    }
    if !normalized.is_empty() && trailing_separator {
        normalized.push('/');
    }

    if is_absolute {
        normalized.insert(0, '/');
    }
    normalized
}

/// Join segments with the separator and normalize the result
///
/// Empty segments are skipped; nothing left yields `"."`.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        return ".".to_string();
    }
    normalize(&joined)
}

/// Resolve segments right to left against `cwd`
///
/// Accumulation stops at the first absolute segment; `cwd` is consulted only
/// when no segment is absolute. With an absolute `cwd` the result is always
/// absolute.
pub fn resolve_in<S: AsRef<str>>(cwd: &str, segments: &[S]) -> String {
    let mut resolved = String::new();
    let mut resolved_absolute = false;

    let candidates = segments
        .iter()
        .rev()
        .map(AsRef::as_ref)
        .chain(std::iter::once(cwd));

    for segment in candidates {
        if resolved_absolute {
            break;
        }
        if segment.is_empty() {
            continue;
        }
        resolved = if resolved.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", segment, resolved)
        };
        resolved_absolute = segment.as_bytes()[0] == SLASH;
    }

    let normalized = normalize_segments(&resolved, !resolved_absolute);
    if resolved_absolute {
        format!("/{}", normalized)
    } else if !normalized.is_empty() {
        normalized
    } else {
        ".".to_string()
    }
}

/// Resolve segments against the process working directory
pub fn resolve<S: AsRef<str>>(segments: &[S]) -> String {
    resolve_in(&process_cwd(), segments)
}

/// Relative path from `from` to `to`, both resolved against `cwd`
///
/// Identical inputs give `""`. When `from` is an ancestor of `to` the result
/// is the remainder of `to` with no leading `..`. A relative `cwd` is
/// anchored at the root first.
pub fn relative_in(cwd: &str, from: &str, to: &str) -> String {
    if from == to {
        return String::new();
    }

    let cwd = if is_absolute(cwd) {
        cwd.to_string()
    } else {
        resolve_in("/", &[cwd])
    };
    let from = resolve_in(&cwd, &[from]);
    let to = resolve_in(&cwd, &[to]);
    if from == to {
        return String::new();
    }

    let f = from.as_bytes();
    let t = to.as_bytes();

    let from_start = skip_leading_slashes(f);
    let from_end = f.len();
    let from_len = from_end - from_start;

    let to_start = skip_leading_slashes(t);
    let to_len = t.len() - to_start;

    let length = from_len.min(to_len);
    let mut last_common_sep: isize = -1;
    let mut i = 0usize;

    while i <= length {
        if i == length {
            if to_len > length {
                if t[to_start + i] == SLASH {
                    // `from` is the exact base of `to`
                    return to[to_start + i + 1..].to_string();
                } else if i == 0 {
                    // `from` is the root
                    return to[to_start..].to_string();
                }
            } else if from_len > length {
                if f[from_start + i] == SLASH {
                    // `to` is the exact base of `from`
                    last_common_sep = i as isize;
                } else if i == 0 {
                    // `to` is the root
                    last_common_sep = 0;
                }
            }
            break;
        }

        let from_code = f[from_start + i];
        if from_code != t[to_start + i] {
            break;
        } else if from_code == SLASH {
            last_common_sep = i as isize;
        }
        i += 1;
    }

    let mut out = String::new();
    let mut j = (from_start as isize + last_common_sep + 1) as usize;
    while j <= from_end {
        if j == from_end || f[j] == SLASH {
            if out.is_empty() {
                out.push_str("..");
            } else {
                out.push_str("/..");
            }
        }
        j += 1;
    }

    let mut rest = (to_start as isize + last_common_sep) as usize;
    if !out.is_empty() {
        out.push_str(&to[rest..]);
        return out;
    }

    if t.get(rest) == Some(&SLASH) {
        rest += 1;
    }
    to[rest..].to_string()
}

/// Relative path from `from` to `to`, resolved against the process working directory
pub fn relative(from: &str, to: &str) -> String {
    relative_in(&process_cwd(), from, to)
}

/// Check whether a path starts at the root
#[inline]
pub fn is_absolute(path: &str) -> bool {
    path.as_bytes().first() == Some(&SLASH)
}

fn skip_leading_slashes(bytes: &[u8]) -> usize {
    let mut start = 1;
    while start < bytes.len() && bytes[start] == SLASH {
        start += 1;
    }
    start.min(bytes.len())
}

fn process_cwd() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "/".to_string())
}
