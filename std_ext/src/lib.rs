use std::sync::Arc;

use easy_ext::ext;

#[ext(ArcExt)]
pub impl<T: ?Sized> Arc<T> {
    #[must_use]
    fn clone_arc(&self) -> Self {
        Self::clone(self)
    }
}

#[ext(CopyExt)]
pub impl<T: Copy> T {
    fn copy(&self) -> Self {
        *self
    }
}
