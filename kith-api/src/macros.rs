//! Router state plumbing.

/// `FromRef<AppState>` for each listed field, so handlers can ask for
/// `State<FieldType>` instead of the whole state.
///
/// ```ignore
/// impl_from_ref! {
///     db: DbClient,
///     users: UserService,
/// }
/// ```
macro_rules! impl_from_ref {
    ($($field:ident: $type:ty),+ $(,)?) => {
        $(
            impl axum::extract::FromRef<$crate::state::AppState> for $type {
                fn from_ref(state: &$crate::state::AppState) -> Self {
                    state.$field.clone()
                }
            }
        )+
    };
}

pub(crate) use impl_from_ref;
