//! 数据库仓储层
//!
//! 每张表一个仓储，服务层通过 trait 依赖抽象，事务内操作使用
//! 关联函数直接作用于事务连接

pub mod balance_unit_repo;
pub mod projection_repo;
pub mod trade_repo;
pub mod traits;
pub mod user_directory;

pub use balance_unit_repo::{BalanceUnitRepository, ReclaimedUnit};
pub use projection_repo::ProjectionRepository;
pub use trade_repo::TradeRepository;
pub use traits::{
    BalanceUnitRepositoryTrait, ProjectionRepositoryTrait, TradeRepositoryTrait,
    UserDirectoryTrait,
};
pub use user_directory::PgUserDirectory;
