use kernel::id::Id;

pub struct UserMarker;
pub type UserId = Id<UserMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_rejects_non_positive() {
        assert!(UserId::new(0).is_err());
        assert!(UserId::new(-3).is_err());
        assert_eq!(UserId::new(12).unwrap().get(), 12);
    }

    #[test]
    fn test_user_id_parse() {
        let id: UserId = "7".parse().unwrap();
        assert_eq!(id, UserId::from_db(7));
        assert!("seven".parse::<UserId>().is_err());
    }
}
