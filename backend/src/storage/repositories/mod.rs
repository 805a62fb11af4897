pub mod cobro_repository;
pub mod comerciante_repository;
pub mod puesto_repository;
pub mod usuario_repository;

pub use cobro_repository::CobroRepository;
pub use comerciante_repository::ComercianteRepository;
pub use puesto_repository::PuestoRepository;
pub use usuario_repository::UsuarioRepository;
