/// HTTP Method.
///
/// Registered methods of [RFC9110] and PATCH of [RFC5789] are interned, any other token is kept
/// as an extension method.
///
/// [RFC5789]: https://www.rfc-editor.org/rfc/rfc5789
/// [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-methods>
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Method(Repr);

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
    Known(u8),
    Extension(Box<str>),
}

struct Props {
    safe: bool,
    idem: bool,
    value: &'static str,
}

props! {
    static PROPS: [9];

    /// [GET](https://www.rfc-editor.org/rfc/rfc9110.html#name-get)
    pub const GET = (0, "GET", safe, idem);
    /// [HEAD](https://www.rfc-editor.org/rfc/rfc9110.html#name-head), the response carries no
    /// content.
    pub const HEAD = (1, "HEAD", safe, idem);
    /// [POST](https://www.rfc-editor.org/rfc/rfc9110.html#name-post)
    pub const POST = (2, "POST", , );
    /// [PUT](https://www.rfc-editor.org/rfc/rfc9110.html#name-put)
    pub const PUT = (3, "PUT", , idem);
    /// [DELETE](https://www.rfc-editor.org/rfc/rfc9110.html#name-delete)
    pub const DELETE = (4, "DELETE", , idem);
    /// [CONNECT](https://www.rfc-editor.org/rfc/rfc9110.html#name-connect)
    pub const CONNECT = (5, "CONNECT", , );
    /// [OPTIONS](https://www.rfc-editor.org/rfc/rfc9110.html#name-options)
    pub const OPTIONS = (6, "OPTIONS", safe, idem);
    /// [TRACE](https://www.rfc-editor.org/rfc/rfc9110.html#name-trace)
    pub const TRACE = (7, "TRACE", safe, idem);
    /// [PATCH](https://www.rfc-editor.org/rfc/rfc5789#section-2)
    pub const PATCH = (8, "PATCH", , );
}

impl Method {
    /// Create a method from a request line token.
    ///
    /// Method names are case sensitive, `get` is an extension method.
    pub fn from_token(token: &str) -> Method {
        match Self::registered(token) {
            Some(method) => method,
            None => Method(Repr::Extension(token.into())),
        }
    }

    /// Returns `true` if method is considered ["safe"].
    ///
    /// ["safe"]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-safe-methods>
    #[inline]
    pub fn is_safe(&self) -> bool {
        match self.0 {
            Repr::Known(idx) => PROPS[idx as usize].safe,
            Repr::Extension(_) => false,
        }
    }

    /// Returns `true` if method is considered ["idempotent"].
    ///
    /// ["idempotent"]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-idempotent-methods>
    #[inline]
    pub fn is_idempotent(&self) -> bool {
        match self.0 {
            Repr::Known(idx) => PROPS[idx as usize].idem,
            Repr::Extension(_) => false,
        }
    }

    #[inline]
    pub fn is_head(&self) -> bool {
        self.0 == Repr::Known(1)
    }

    /// Returns string representation of the method.
    #[inline]
    pub fn as_str(&self) -> &str {
        match &self.0 {
            Repr::Known(idx) => PROPS[*idx as usize].value,
            Repr::Extension(token) => token,
        }
    }
}

impl Default for Method {
    #[inline]
    fn default() -> Self {
        Self::GET
    }
}

impl std::fmt::Debug for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        str::fmt(self.as_str(), f)
    }
}

impl PartialEq<str> for Method {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

// ===== Macros =====

macro_rules! props {
    (
        static $props:ident: [$len:literal];
        $(
           $(#[$doc:meta])*
           pub const $name:ident = ($idx:literal, $val:literal, $($safe:ident)?, $($idem:ident)?);
        )*
    ) => {
        impl Method {
            $(
               $(#[$doc])*
               pub const $name: Self = Self(Repr::Known($idx));
            )*

            fn registered(token: &str) -> Option<Method> {
                match token {
                    $(
                        $val => Some(Self::$name),
                    )*
                    _ => None,
                }
            }
        }

        static $props: [Props; $len] = [
            $(
                Props { value: $val, safe: prop!($($safe)?), idem: prop!($($idem)?) },
            )*
        ];
    };
}

macro_rules! prop {
    (safe) => { true };
    (idem) => { true };
    () => { false };
}

use {props, prop};

#[cfg(test)]
mod test {
    use super::Method;

    #[test]
    fn method_props() {
        assert_eq!(Method::from_token("GET"), Method::GET);
        assert!(Method::from_token("HEAD").is_head());
        assert!(Method::PUT.is_idempotent());
        assert!(!Method::PUT.is_safe());
        assert!(!Method::POST.is_idempotent());

        let ext = Method::from_token("PROPFIND");
        assert_eq!(ext.as_str(), "PROPFIND");
        assert!(!ext.is_safe());
        assert_ne!(Method::from_token("get"), Method::GET);
    }
}
