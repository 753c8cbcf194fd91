//! Byte class lookup tables used by the request parser.
macro_rules! byte_map {
    // ===== 256 lookup table, as a predicate =====
    {
        $(#[$meta:meta])*
        $vis:vis const fn $fn_id:ident($byte:ident:$u8:ty) { $e:expr }
    } => {
        $(#[$meta])*
        $vis const fn $fn_id($byte: $u8) -> bool {
            const PAT: [bool; 256] = {
                let mut bytes = [false; 256];
                let mut $byte = 0u8;
                const fn filter($byte: $u8) -> bool {
                    $e
                }
                loop {
                    bytes[$byte as usize] = filter($byte);
                    if $byte == 255 {
                        break;
                    }
                    $byte += 1;
                }
                bytes
            };
            PAT[$byte as usize]
        }
    };
    // ===== 256 lookup table, as a plain array that can be extended at runtime =====
    {
        $(#[$meta:meta])*
        $vis:vis const $cnid:ident: ByteClass = |$byte:ident| $e:expr;
    } => {
        $(#[$meta])*
        $vis const $cnid: ByteClass = {
            let mut bytes = [false; 256];
            let mut $byte = 0u8;
            loop {
                bytes[$byte as usize] = $e;
                if $byte == 255 {
                    break;
                }
                $byte += 1;
            }
            ByteClass(bytes)
        };
    };
}

/// Membership table over all 256 byte values.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteClass([bool; 256]);

impl ByteClass {
    /// Returns `true` if `byte` belongs to the class.
    #[inline(always)]
    pub const fn contains(&self, byte: u8) -> bool {
        self.0[byte as usize]
    }

    /// Returns a copy of this class that also accepts every byte of `extra`.
    pub fn with(&self, extra: &[u8]) -> ByteClass {
        let mut bytes = self.0;
        for &byte in extra {
            bytes[byte as usize] = true;
        }
        ByteClass(bytes)
    }
}

impl std::fmt::Debug for ByteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members = self.0.iter().filter(|e| **e).count();
        f.debug_tuple("ByteClass").field(&members).finish()
    }
}

// ===== Blocks =====

/// unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"
const fn unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// sub-delims = "!" / "$" / "&" / "'" / "(" / ")"
///            / "*" / "+" / "," / ";" / "="
const fn sub_delims(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
    )
}

/// pchar = unreserved / pct-encoded / sub-delims / ":" / "@"
const fn pchar(byte: u8) -> bool {
    unreserved(byte) || sub_delims(byte) || matches!(byte, b'%' | b':' | b'@')
}

// ===== lookup table =====

byte_map! {
    /// token   = 1*tchar
    /// tchar   = "!" / "#" / "$" / "%" / "&" / "'" / "*"
    ///         / "+" / "-" / "." / "^" / "_" / "`" / "|" / "~"
    ///         / DIGIT / ALPHA
    #[inline(always)]
    pub const fn is_token(byte: u8) {
        matches!(
            byte,
            | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*'
            | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
        || byte.is_ascii_alphanumeric()
    }
}

byte_map! {
    /// Bytes allowed in the protocol token of the request line, e.g. `HTTP/1.1`.
    #[inline(always)]
    pub const fn is_http_protocol(byte: u8) {
        byte.is_ascii_alphanumeric() || matches!(byte, b'/' | b'.')
    }
}

byte_map! {
    /// CTL = %x00-1F / %x7F
    #[inline(always)]
    pub const fn is_control(byte: u8) {
        byte < 0x20 || byte == 0x7f
    }
}

byte_map! {
    /// origin-form / absolute-form / authority-form / asterisk-form path bytes, without query.
    pub const STRICT_PATH: ByteClass = |byte| pchar(byte) || byte == b'/';
}

byte_map! {
    /// query = *( pchar / "/" / "?" )
    pub const STRICT_QUERY: ByteClass = |byte| pchar(byte) || byte == b'/' || byte == b'?';
}

/// Bytes that may be admitted in paths and queries when relaxed parsing is configured.
pub const RELAXABLE: &[u8] = b"\"<>[\\]^`{|}";

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_and_target_tables() {
        assert!(is_token(b'G'));
        assert!(is_token(b'~'));
        assert!(!is_token(b' '));
        assert!(!is_token(b':'));
        assert!(!is_token(0x80));

        assert!(STRICT_PATH.contains(b'/'));
        assert!(STRICT_PATH.contains(b'%'));
        assert!(!STRICT_PATH.contains(b'?'));
        assert!(!STRICT_PATH.contains(b'{'));
        assert!(STRICT_QUERY.contains(b'?'));

        let relaxed = STRICT_PATH.with(b"{}");
        assert!(relaxed.contains(b'{'));
        assert!(!relaxed.contains(b'|'));
    }

    #[test]
    fn control_table() {
        assert!(is_control(b'\r'));
        assert!(is_control(0x7f));
        assert!(!is_control(b'a'));
        assert!(is_http_protocol(b'/'));
        assert!(!is_http_protocol(b' '));
    }
}
