mod attachment;

pub use attachment::{
    Attachment, FileUpload, NewAttachment, OwnerKind, OwnerRef, SignedUrl, UploadLimits,
};
