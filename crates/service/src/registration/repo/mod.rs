pub mod seaorm;

pub use seaorm::SeaOrmRegistrationRepository;
