use anyhow::Result;
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared::{NuevoUsuario, Usuario};
use tracing::info;

use crate::storage::connection::DbConnection;
use crate::storage::repositories::UsuarioRepository;
use crate::storage::traits::UsuarioStorage;

#[derive(Debug, thiserror::Error)]
pub enum UsuarioValidationError {
    #[error("Name, surname, login and password are all required")]
    CamposVacios,
    #[error("Login '{0}' is already taken")]
    LoginDuplicado(String),
}

/// Service for collector accounts: registration and credential checks.
///
/// Passwords are stored only as a salted one-way digest ("salt$digest");
/// login uniqueness is enforced here, not by a database constraint.
#[derive(Clone)]
pub struct UsuarioService {
    repository: UsuarioRepository,
}

impl UsuarioService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: UsuarioRepository::new(db),
        }
    }

    pub async fn register(&self, nuevo: NuevoUsuario) -> Result<Usuario> {
        let blank = [
            &nuevo.nombre,
            &nuevo.apellido,
            &nuevo.usuario_login,
            &nuevo.contrasena,
        ]
        .iter()
        .any(|campo| campo.trim().is_empty());
        if blank {
            return Err(UsuarioValidationError::CamposVacios.into());
        }

        if self
            .repository
            .get_usuario_by_login(&nuevo.usuario_login)
            .await?
            .is_some()
        {
            return Err(UsuarioValidationError::LoginDuplicado(nuevo.usuario_login).into());
        }

        let mut usuario = Usuario {
            id_usuario: 0,
            nombre: nuevo.nombre,
            apellido: nuevo.apellido,
            usuario_login: nuevo.usuario_login,
            contrasena_hash: hash_password(&nuevo.contrasena),
        };
        usuario.id_usuario = self.repository.store_usuario(&usuario).await?;

        info!("Registered collector {} ({})", usuario.id_usuario, usuario.usuario_login);
        Ok(usuario)
    }

    /// Check a login/password pair; `None` for an unknown login or a
    /// wrong password, indistinguishably
    pub async fn authenticate(&self, usuario_login: &str, contrasena: &str) -> Result<Option<Usuario>> {
        let Some(usuario) = self.repository.get_usuario_by_login(usuario_login).await? else {
            return Ok(None);
        };

        if verify_password(contrasena, &usuario.contrasena_hash) {
            Ok(Some(usuario))
        } else {
            Ok(None)
        }
    }

    pub async fn get_usuario(&self, id_usuario: i64) -> Result<Option<Usuario>> {
        self.repository.get_usuario(id_usuario).await
    }
}

/// Salted SHA-256, encoded as "salt$digest" in hex
fn hash_password(contrasena: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    format!("{}${}", salt_hex, digest_with_salt(&salt_hex, contrasena))
}

fn verify_password(contrasena: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt_hex, digest)) => digest_with_salt(salt_hex, contrasena) == digest,
        None => false,
    }
}

fn digest_with_salt(salt_hex: &str, contrasena: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(contrasena.as_bytes());
    hex::encode(hasher.finalize())
}
