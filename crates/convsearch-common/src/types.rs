use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Author role of an archived message, as accepted by the role filter.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Assistant, Role::Tool];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(Error::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn parses_known_roles() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn rejects_unknown_and_differently_cased_roles() {
        assert!("admin".parse::<Role>().is_err());
        assert!("User".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn displays_as_lowercase_name() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(format!("{}", Role::Tool), "tool");
    }
}
