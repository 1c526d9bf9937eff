// Upload-analyze: store a resume and its preview, ask the model for feedback,
// persist the result. All collaborators are passed in through `Collaborators`.

pub mod handlers;
pub mod model;
pub mod progress;
pub mod prompts;
pub mod upload;
pub mod workflow;
