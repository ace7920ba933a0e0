//! Gestion des erreurs pour les services SOAP

use crate::transport::TransportError;
use thiserror::Error;

/// Type Result personnalisé pour pmosoap
pub type Result<T> = std::result::Result<T, SoapServiceError>;

/// Erreurs possibles lors de l'utilisation d'un service SOAP
#[derive(Error, Debug)]
pub enum SoapServiceError {
    /// Ni WSDL, ni couple location/uri complet dans la configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Échec lors de l'établissement du client SOAP ou des en-têtes
    #[error("Unexpected SOAP service exception: {0}")]
    Construction(String),

    /// Argument invalide (nom d'opération vide, etc.)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Opération inconnue du service
    #[error("Function '{0}' does not exist on this service.")]
    NotFound(String),

    /// Erreur de la couche SOAP, remontée sans modification
    #[error(transparent)]
    Upstream(#[from] TransportError),

    /// Réponse SOAP trop profonde pour être normalisée
    #[error("SOAP response nesting exceeds {0} levels")]
    ResponseTooDeep(usize),
}

impl SoapServiceError {
    /// Vérifie si l'erreur empêche le service de démarrer
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SoapServiceError::Configuration(_) | SoapServiceError::Construction(_)
        )
    }

    /// Vérifie si l'erreur correspond à une opération inconnue
    pub fn is_not_found(&self) -> bool {
        matches!(self, SoapServiceError::NotFound(_))
    }

    /// Vérifie si l'erreur correspond à un argument invalide
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, SoapServiceError::InvalidArgument(_))
    }

    /// Code de statut HTTP associé à l'erreur
    pub fn status_code(&self) -> u16 {
        match self {
            SoapServiceError::InvalidArgument(_) => 400,
            SoapServiceError::NotFound(_) => 404,
            SoapServiceError::Upstream(_) => 502,
            _ => 500,
        }
    }
}
