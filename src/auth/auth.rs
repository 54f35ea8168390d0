use crate::config::Config;
use crate::{auth::jwt::verify_token, model::role::Role, models::TokenType};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already verified by auth_middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) if c.token_type == TokenType::Access => c,
            _ => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
        }))
    }
}

impl AuthUser {
    pub fn is_hr_or_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.is_hr_or_admin() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// Employees act for themselves only; HR and admins for anyone.
    pub fn can_act_for(&self, user_id: u64) -> bool {
        self.user_id == user_id || self.is_hr_or_admin()
    }

    pub fn require_self_or_hr(&self, user_id: u64) -> actix_web::Result<()> {
        if self.can_act_for(user_id) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden(
                "Not allowed to access another user's attendance",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use actix_web::test::TestRequest;

    fn config() -> Config {
        Config {
            database_url: "mysql://localhost/attendance".into(),
            db_max_connections: 1,
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            log_level: "debug".into(),
            rate_actions_per_min: 30,
            rate_protected_per_min: 1000,
            overtime_threshold_minutes: 480,
            weekend_days: vec![],
            holidays: vec![],
        }
    }

    #[actix_web::test]
    async fn extracts_user_from_bearer_token() {
        let token = generate_access_token(7, "ann".into(), Role::Employee.id(), "test-secret", 60);
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.role, Role::Employee);
        assert!(user.can_act_for(7));
        assert!(!user.can_act_for(8));
        assert!(user.require_hr_or_admin().is_err());
    }

    #[actix_web::test]
    async fn missing_or_foreign_token_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());

        let token = generate_access_token(7, "ann".into(), Role::Admin.id(), "other-secret", 60);
        let req = TestRequest::default()
            .app_data(Data::new(config()))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());
    }

    #[test]
    fn hr_can_act_for_anyone() {
        let hr = AuthUser {
            user_id: 1,
            username: "hr".into(),
            role: Role::Hr,
        };
        assert!(hr.can_act_for(99));
        assert!(hr.require_hr_or_admin().is_ok());
    }
}
