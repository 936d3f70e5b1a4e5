mod file_dto;

pub use file_dto::{
    effective_limit, escape_like_pattern, file_extension, FileResponseDto, ListFilesQuery,
    ShareFileDto, SortKey, UploadFileDto,
};
