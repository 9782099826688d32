//! 收据 ID 生成器

use uuid::Uuid;

/// Source of identities for newly promoted receipts.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 identities, the format accepted by receipt id validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}
