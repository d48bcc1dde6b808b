use model::MetroError;

pub type RouterResult<T> = Result<T, MetroError>;
