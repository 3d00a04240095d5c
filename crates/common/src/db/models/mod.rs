//! SeaORM entity models
//!
//! Database entities for PaperDesk

mod user;
mod role;
mod permission;
mod role_user;
mod permission_role;
mod paper;
mod paper_type;
mod paper_resource;
mod tag;
mod paper_tag;
mod subject;
mod paper_subject;
mod country;
mod province;
mod city;
mod person;
mod export;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use role::{
    Entity as RoleEntity,
    Model as Role,
    ActiveModel as RoleActiveModel,
    Column as RoleColumn,
};

pub use permission::{
    Entity as PermissionEntity,
    Model as Permission,
    ActiveModel as PermissionActiveModel,
    Column as PermissionColumn,
};

pub use role_user::{
    Entity as RoleUserEntity,
    Model as RoleUser,
    ActiveModel as RoleUserActiveModel,
    Column as RoleUserColumn,
};

pub use permission_role::{
    Entity as PermissionRoleEntity,
    Model as PermissionRole,
    ActiveModel as PermissionRoleActiveModel,
    Column as PermissionRoleColumn,
};

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use paper_type::{
    Entity as PaperTypeEntity,
    Model as PaperType,
    ActiveModel as PaperTypeActiveModel,
    Column as PaperTypeColumn,
};

pub use paper_resource::{
    Entity as PaperResourceEntity,
    Model as PaperResource,
    ActiveModel as PaperResourceActiveModel,
    Column as PaperResourceColumn,
};

pub use tag::{
    Entity as TagEntity,
    Model as Tag,
    ActiveModel as TagActiveModel,
    Column as TagColumn,
};

pub use paper_tag::{
    Entity as PaperTagEntity,
    Model as PaperTag,
    ActiveModel as PaperTagActiveModel,
    Column as PaperTagColumn,
};

pub use subject::{
    Entity as SubjectEntity,
    Model as Subject,
    ActiveModel as SubjectActiveModel,
    Column as SubjectColumn,
};

pub use paper_subject::{
    Entity as PaperSubjectEntity,
    Model as PaperSubject,
    ActiveModel as PaperSubjectActiveModel,
    Column as PaperSubjectColumn,
};

pub use country::{
    Entity as CountryEntity,
    Model as Country,
    ActiveModel as CountryActiveModel,
    Column as CountryColumn,
};

pub use province::{
    Entity as ProvinceEntity,
    Model as Province,
    ActiveModel as ProvinceActiveModel,
    Column as ProvinceColumn,
};

pub use city::{
    Entity as CityEntity,
    Model as City,
    ActiveModel as CityActiveModel,
    Column as CityColumn,
};

pub use person::{
    Entity as PersonEntity,
    Model as Person,
    ActiveModel as PersonActiveModel,
    Column as PersonColumn,
};

pub use export::{
    Entity as ExportEntity,
    Model as Export,
    ActiveModel as ExportActiveModel,
    Column as ExportColumn,
};
