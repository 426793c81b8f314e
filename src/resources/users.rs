use super::{
  changed, optional, parse, parse_bool, required, role_tone, yes_no, FormField, FormValues,
  Resource,
};
use crate::api::types::{ListParams, NewUser, Page, User, UserRole, UserStats, UserUpdate};
use crate::api::{ApiClient, ApiError};
use crate::mutation::Mutation;
use crate::table::{Cell, CellRender, ColumnDescriptor, FieldValue, Row, RowAction};
use futures::future::{BoxFuture, FutureExt};

impl Row for User {
  fn field(&self, key: &str) -> Option<FieldValue> {
    match key {
      "id" => Some(self.id.as_str().into()),
      "email" => Some(self.email.as_str().into()),
      "first_name" => Some(self.first_name.as_str().into()),
      "last_name" => Some(self.last_name.as_str().into()),
      "phone" => self.phone.as_deref().map(FieldValue::from),
      "role" => Some(self.role.as_str().into()),
      "is_active" => Some(self.is_active.into()),
      "created_at" => Some(self.created_at.into()),
      _ => None,
    }
  }

  fn row_key(&self) -> String {
    self.id.clone()
  }
}

fn name_cell(_value: Option<&FieldValue>, user: &User) -> Cell {
  Cell::new(user.full_name())
}

fn actions(_user: &User) -> Vec<RowAction> {
  vec![RowAction::Edit, RowAction::Delete]
}

impl Resource for User {
  type Stats = UserStats;

  const NAME: &'static str = "users";
  const STATS: &'static str = "user-stats";
  const TITLE: &'static str = "Users";
  const EMPTY_MESSAGE: &'static str = "No users found.";

  fn columns() -> Vec<ColumnDescriptor<Self>> {
    vec![
      ColumnDescriptor::field("id", "ID", 10),
      ColumnDescriptor::field("name", "Name", 22).with_render(CellRender::Custom(name_cell)),
      ColumnDescriptor::field("email", "Email", 28).with_render(CellRender::Truncate(28)),
      ColumnDescriptor::field("phone", "Phone", 14),
      ColumnDescriptor::field("role", "Role", 9).with_render(CellRender::Badge(role_tone)),
      ColumnDescriptor::field("is_active", "Active", 6).with_render(CellRender::YesNo),
      ColumnDescriptor::field("created_at", "Joined", 10).with_render(CellRender::Date),
      ColumnDescriptor::actions(actions, 16),
    ]
  }

  fn fetch_page(
    api: ApiClient,
    params: ListParams,
  ) -> BoxFuture<'static, Result<Page<Self>, ApiError>> {
    async move { api.list_users(&params).await }.boxed()
  }

  fn fetch_one(api: ApiClient, id: String) -> BoxFuture<'static, Result<Self, ApiError>> {
    async move { api.get_user(&id).await }.boxed()
  }

  fn fetch_stats(api: ApiClient) -> BoxFuture<'static, Result<Self::Stats, ApiError>> {
    async move { api.user_stats().await }.boxed()
  }

  fn stats_line(stats: &UserStats) -> String {
    format!(
      "total {}  active {}  admins {}",
      stats.total_users, stats.active_users, stats.admins
    )
  }

  fn row_actions(user: &Self) -> Vec<RowAction> {
    actions(user)
  }

  fn action_mutation(user: &Self, action: RowAction) -> Option<Mutation> {
    match action {
      RowAction::Delete => Some(Mutation::DeleteUser {
        id: user.id.clone(),
      }),
      _ => None,
    }
  }

  fn create_form() -> Option<Vec<FormField>> {
    Some(vec![
      FormField::new("email", "Email", ""),
      FormField::new("first_name", "First name", ""),
      FormField::new("last_name", "Last name", ""),
      FormField::new("phone", "Phone", ""),
      FormField::new("role", "Role", UserRole::Customer.as_str()),
    ])
  }

  fn build_create(values: &FormValues) -> Result<Mutation, String> {
    Ok(Mutation::CreateUser(NewUser {
      email: required(values, "email")?,
      first_name: required(values, "first_name")?,
      last_name: required(values, "last_name")?,
      phone: optional(values, "phone"),
      role: parse(values, "role")?,
    }))
  }

  fn edit_form(user: &Self) -> Option<Vec<FormField>> {
    Some(vec![
      FormField::new("email", "Email", user.email.clone()),
      FormField::new("first_name", "First name", user.first_name.clone()),
      FormField::new("last_name", "Last name", user.last_name.clone()),
      FormField::new("phone", "Phone", user.phone.clone().unwrap_or_default()),
      FormField::new("role", "Role", user.role.as_str()),
      FormField::new("is_active", "Active", yes_no(user.is_active)),
    ])
  }

  fn build_edit(user: &Self, values: &FormValues) -> Result<Mutation, String> {
    let update = UserUpdate {
      email: changed(required(values, "email")?, &user.email),
      first_name: changed(required(values, "first_name")?, &user.first_name),
      last_name: changed(required(values, "last_name")?, &user.last_name),
      phone: optional(values, "phone").and_then(|p| changed(Some(p), &user.phone).flatten()),
      role: changed(parse(values, "role")?, &user.role),
      is_active: changed(parse_bool(values, "is_active")?, &user.is_active),
    };
    Ok(Mutation::UpdateUser {
      id: user.id.clone(),
      update,
    })
  }

  fn detail(user: &Self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", user.id.clone()),
      ("Name", user.full_name()),
      ("Email", user.email.clone()),
      ("Phone", user.phone.clone().unwrap_or_else(|| "-".to_string())),
      ("Role", user.role.to_string()),
      ("Active", yes_no(user.is_active).to_string()),
      ("Joined", user.created_at.format("%Y-%m-%d %H:%M").to_string()),
    ]
  }
}
