use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Extension, Json};
use mongodb::bson::oid::ObjectId;
use tracing::{error, info, warn};
use validator::Validate;

use crate::{
    database::Database,
    errors::AppError,
    models::{CreateUserRequest, LoginRequest, MangoUser, UserResponse},
};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InvalidInput(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        error!("Stored password hash is unreadable: {e}");
        AppError::Internal
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn validate<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Stores a new account with a hashed password.
pub async fn create_user(db: &Database, req: CreateUserRequest) -> Result<ObjectId, AppError> {
    validate(&req)?;
    db.ensure_user_index().await?;

    let user = MangoUser::new(req.username, hash_password(&req.password)?);
    let id = db.insert_user(&user).await?;
    info!(username = %user.username, %id, "Created MangoREST user");
    Ok(id)
}

/// Looks up an account and checks its password.
pub async fn login_service(db: &Database, req: LoginRequest) -> Result<MangoUser, AppError> {
    validate(&req)?;
    let user = db
        .find_user(&req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // Accounts whose stored hash is not a PHC string cannot log in.
    let verified = match verify_password(&req.password, &user.password_hash) {
        Ok(verified) => verified,
        Err(AppError::Internal) => {
            warn!(username = %user.username, "Rejecting login for account with unreadable hash");
            false
        }
        Err(e) => return Err(e),
    };
    if !verified {
        return Err(AppError::Unauthorized);
    }

    Ok(user)
}

pub async fn login(
    Extension(db): Extension<Database>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = login_service(&db, req).await?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("123qwerty").unwrap();
        assert_ne!(hash, "123qwerty");
        assert!(verify_password("123qwerty", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("123qwerty").unwrap(),
            hash_password("123qwerty").unwrap()
        );
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AppError::Internal)
        ));
    }

    #[test]
    fn test_create_user_request_validation() {
        let short = CreateUserRequest {
            username: "neeban".to_string(),
            password: "short".to_string(),
        };
        assert!(matches!(validate(&short), Err(AppError::InvalidInput(_))));

        let ok = CreateUserRequest {
            username: "neeban".to_string(),
            password: "123qwerty".to_string(),
        };
        assert!(validate(&ok).is_ok());
    }
}
