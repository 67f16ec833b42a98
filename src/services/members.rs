//! Member management service

use validator::Validate;

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, MemberQuery, ReplaceMember, UpdateMember},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        tracing::debug!("Listing members (search: {:?})", query.search);
        self.repository.members.list(query.search.as_deref()).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        data.validate()?;
        let member = self.repository.members.create(data).await?;
        tracing::info!("Member {} created", member.id);
        Ok(member)
    }

    pub async fn update(&self, id: i32, data: &UpdateMember) -> AppResult<Member> {
        data.validate()?;
        let member = self.repository.members.update(id, data).await?;
        tracing::info!("Member {} updated", member.id);
        Ok(member)
    }

    pub async fn replace(&self, id: i32, data: ReplaceMember) -> AppResult<Member> {
        self.update(id, &UpdateMember::from(data)).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.members.delete(id).await?;
        tracing::info!("Member {} deleted", id);
        Ok(())
    }
}
