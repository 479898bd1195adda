use std::cmp::Ordering;

/// Compares two version strings with the boot loader's ordering.
///
/// Alphanumeric runs are segments; numeric segments compare by value and beat alphabetic ones.
/// Between segments `~` sorts below the end of the string, which sorts below `-`, `^` and `.` in
/// that order. Any other character is skipped.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let (mut a, mut b) = (left.as_bytes(), right.as_bytes());
    if a.is_empty() || b.is_empty() {
        return a.cmp(b);
    }

    loop {
        a = skip_invalid(a);
        b = skip_invalid(b);

        let (a_tilde, b_tilde) = (starts_with(a, b'~'), starts_with(b, b'~'));
        if a_tilde || b_tilde {
            let ordering = (!a_tilde).cmp(&!b_tilde);
            if ordering != Ordering::Equal {
                return ordering;
            }
            a = &a[1..];
            b = &b[1..];
        }

        if a.is_empty() || b.is_empty() {
            return a.cmp(b);
        }

        for separator in [b'-', b'^', b'.'] {
            let (on_a, on_b) = (starts_with(a, separator), starts_with(b, separator));
            if on_a || on_b {
                let ordering = (!on_a).cmp(&!on_b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a = &a[1..];
                b = &b[1..];
            }
        }

        let a_digit = a.first().is_some_and(u8::is_ascii_digit);
        let b_digit = b.first().is_some_and(u8::is_ascii_digit);
        let (a_len, b_len) = if a_digit {
            if !b_digit {
                return Ordering::Greater;
            }
            a = trim_zeros(a);
            b = trim_zeros(b);
            let (a_len, b_len) = (span(a, u8::is_ascii_digit), span(b, u8::is_ascii_digit));
            let ordering = a_len
                .cmp(&b_len)
                .then_with(|| a[..a_len].cmp(&b[..b_len]));
            if ordering != Ordering::Equal {
                return ordering;
            }
            (a_len, b_len)
        } else if b_digit {
            return Ordering::Less;
        } else {
            let (a_len, b_len) = (
                span(a, u8::is_ascii_alphabetic),
                span(b, u8::is_ascii_alphabetic),
            );
            let shared = a_len.min(b_len);
            let ordering = a[..shared]
                .cmp(&b[..shared])
                .then_with(|| a_len.cmp(&b_len));
            if ordering != Ordering::Equal {
                return ordering;
            }
            (a_len, b_len)
        };

        a = &a[a_len..];
        b = &b[b_len..];
    }
}

fn is_version_byte(byte: &u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'~' | b'-' | b'^' | b'.')
}

fn skip_invalid(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(is_version_byte)
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn starts_with(bytes: &[u8], byte: u8) -> bool {
    bytes.first() == Some(&byte)
}

fn trim_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|byte| *byte != b'0')
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn span(bytes: &[u8], accept: fn(&u8) -> bool) -> usize {
    bytes
        .iter()
        .position(|byte| !accept(byte))
        .unwrap_or(bytes.len())
}
