use adscore_primitives::EncodingError;
use thiserror::Error;

/// Structural problems with untrusted input: the bytes are not a well-formed
/// signature, frame, payload or key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature version not supported: expected {expected} got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("truncated payload: need {needed} bytes, got {got}")]
    TruncatedPayload { needed: usize, got: usize },

    #[error("not a valid signature payload")]
    EmptyPayload,

    #[error("premature end of signature")]
    TruncatedSignature,

    #[error("invalid text encoding: {0}")]
    InvalidEncoding(#[from] EncodingError),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unexpected payload type {0}")]
    UnexpectedPayloadType(&'static str),

    #[error("malformed PEM: {0}")]
    MalformedPem(&'static str),

    #[error("key corrupted")]
    CorruptKey,

    #[error("invalid key type {0}")]
    InvalidKeyType(u8),
}

impl ParseError {
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::MalformedSignature => 101,
            Self::VersionMismatch { .. } => 102,
            Self::TruncatedPayload { .. } => 103,
            Self::EmptyPayload => 104,
            Self::TruncatedSignature => 106,
            Self::InvalidEncoding(_) => 120,
            Self::MalformedPayload(_) => 121,
            Self::UnexpectedPayloadType(_) => 122,
            Self::MalformedPem(_) => 130,
            Self::CorruptKey => 131,
            Self::InvalidKeyType(_) => 132,
        }
    }
}

/// Frame/tag dispatch problems: the input names a codec or cipher we do not
/// speak, or is tagged for a different one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected serializer type: expected {expected:#04x} got {got:#04x}")]
    FormatMismatch { expected: u8, got: u8 },

    #[error("unsupported struct codec \"{0}\"")]
    UnsupportedCodec(String),

    #[error("unsupported crypt method \"{0}\"")]
    UnsupportedCipher(String),

    #[error("unrecognized payload: expected method {expected:#06x} got {got:#06x}")]
    TagMismatch { expected: u16, got: u16 },

    #[error("value cannot be represented by this codec: {0}")]
    Unrepresentable(String),

    #[error("payload of {0} bytes does not fit the envelope")]
    PayloadTooLarge(usize),
}

impl FormatError {
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::FormatMismatch { .. } => 201,
            Self::UnsupportedCodec(_) => 202,
            Self::UnsupportedCipher(_) => 203,
            Self::TagMismatch { .. } => 204,
            Self::Unrepresentable(_) => 205,
            Self::PayloadTooLarge(_) => 206,
        }
    }
}

/// Failures reported by the cryptographic provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid key length: expected {expected} got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("additional authenticated data is not supported by this cipher")]
    AadUnsupported,

    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    #[error("signature verification error")]
    SignatureError,

    #[error("crypto provider error: {0}")]
    Provider(String),
}

impl CryptoError {
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::AuthenticationFailed => 301,
            Self::InvalidKeyLength { .. } => 302,
            Self::AadUnsupported => 303,
            Self::InvalidKey(_) => 304,
            Self::SignatureError => 305,
            Self::Provider(_) => 306,
        }
    }
}

/// Well-formed signature which does not match the request it came with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("result unavailable for unverified signature")]
    Unverified,

    #[error("invalid sign role")]
    InvalidRole,

    #[error("unrecognized sign type {0}")]
    UnrecognizedSignType(i64),

    #[error("no verdict matched")]
    NoVerdictMatched,

    #[error("signature IP mismatch")]
    IpMismatch,

    #[error("signature user agent mismatch")]
    UserAgentMismatch,

    #[error("signature contains no user agent")]
    MissingUserAgent,

    #[error("signature is missing field \"{0}\"")]
    MissingField(&'static str),

    #[error("no decryption key for zone {0}")]
    KeyNotFound(i64),
}

impl VerifyError {
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Unverified => 401,
            Self::InvalidRole => 402,
            Self::UnrecognizedSignType(_) => 403,
            Self::NoVerdictMatched => 410,
            Self::IpMismatch => 413,
            Self::UserAgentMismatch => 414,
            Self::MissingUserAgent => 415,
            Self::MissingField(_) => 416,
            Self::KeyNotFound(_) => 417,
        }
    }
}

/// Host or caller misconfiguration; not caused by request traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} codec library is not available")]
    UnavailableCodec(&'static str),

    #[error("unsupported algorithm \"{0}\"")]
    UnsupportedAlgorithm(String),

    #[error("unsupported curve type \"{0}\"")]
    UnsupportedCurve(String),

    #[error("invalid line length {0}")]
    InvalidLineLength(usize),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::UnavailableCodec(_) => 501,
            Self::UnsupportedAlgorithm(_) => 502,
            Self::UnsupportedCurve(_) => 503,
            Self::InvalidLineLength(_) => 504,
            Self::Invalid(_) => 505,
        }
    }
}

/// Broad error category, for bucketing in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Format,
    Crypto,
    Verify,
    Config,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<EncodingError> for SignatureError {
    fn from(e: EncodingError) -> Self {
        Self::Parse(ParseError::InvalidEncoding(e))
    }
}

impl SignatureError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Format(_) => ErrorKind::Format,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Verify(_) => ErrorKind::Verify,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Stable numeric discriminant.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Parse(e) => e.code(),
            Self::Format(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Verify(e) => e.code(),
            Self::Config(e) => e.code(),
        }
    }

    /// Signature was well formed but does not match this request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Verify(_))
    }

    /// Host misconfiguration; should not be counted as traffic noise.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T, E = SignatureError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_banded_by_kind() {
        let samples: [SignatureError; 5] = [
            ParseError::TruncatedSignature.into(),
            FormatError::UnsupportedCodec("x".into()).into(),
            CryptoError::AuthenticationFailed.into(),
            VerifyError::NoVerdictMatched.into(),
            ConfigError::UnavailableCodec("igbinary").into(),
        ];
        for e in &samples {
            let band = match e.kind() {
                ErrorKind::Parse => 1,
                ErrorKind::Format => 2,
                ErrorKind::Crypto => 3,
                ErrorKind::Verify => 4,
                ErrorKind::Config => 5,
            };
            assert_eq!(e.code() / 100, band, "{e}");
        }
    }

    #[test]
    fn rejection_vs_fatal() {
        let rejected: SignatureError = VerifyError::IpMismatch.into();
        assert!(rejected.is_rejection());
        assert!(!rejected.is_fatal());

        let fatal: SignatureError = ConfigError::UnavailableCodec("igbinary").into();
        assert!(fatal.is_fatal());
        assert!(!fatal.is_rejection());

        let malformed: SignatureError = ParseError::MalformedSignature.into();
        assert!(!malformed.is_rejection());
        assert!(!malformed.is_fatal());
    }

    #[test]
    fn encoding_errors_are_parse_errors() {
        let e: SignatureError = EncodingError::InvalidHex("odd".into()).into();
        assert_eq!(e.kind(), ErrorKind::Parse);
        assert_eq!(e.code(), 120);
    }
}
