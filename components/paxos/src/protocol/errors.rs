quick_error! {
    /// ProtocolError is a request that does not carry what its kind requires.
    #[derive(Debug, PartialEq, Eq, Clone)]
    pub enum ProtocolError {
        LackOf(field: String) {
            from(field: &str) -> (field.to_string())
            display("lack of required field: {}", field)
        }

        NegativeInstance(instance: i64) {
            display("instance can not be negative: {}", instance)
        }
    }
}
