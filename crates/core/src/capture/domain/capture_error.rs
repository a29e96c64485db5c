use thiserror::Error;

/// Why one source kind declined an input descriptor.
///
/// `InvalidInput` means the descriptor does not have the shape this kind
/// expects (not a file, not a directory, not a device index). `OpenError`
/// means the shape matched but the source could not be initialized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    OpenError(String),
}

impl ProbeError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn open_error(message: impl Into<String>) -> Self {
        Self::OpenError(message.into())
    }

    pub fn is_open_error(&self) -> bool {
        matches!(self, Self::OpenError(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(m) | Self::OpenError(m) => m,
        }
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("read length limit must be positive")]
    ZeroReadLengthLimit,
    /// Every source kind declined the input. One diagnostic per line.
    #[error("{}", .messages.join("\n"))]
    Unresolved { messages: Vec<String> },
    #[error("the image can't be captured from camera {index}")]
    CameraRead { index: u32 },
}
