use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Camera error: {0}")]
    Camera(#[from] nokhwa::NokhwaError),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("Invalid frame: {0}")]
    Frame(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid label file: {0}")]
    Labels(String),

    #[error("Invalid dictionary: {0}")]
    Dictionary(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
