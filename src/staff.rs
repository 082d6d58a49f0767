use crate::models::StaffAccount;

/// Case-insensitive search over the columns shown in the staff list.
/// A blank term returns every account.
pub fn search_staff<'a>(staff: &'a [StaffAccount], term: &str) -> Vec<&'a StaffAccount> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return staff.iter().collect();
    }

    staff
        .iter()
        .filter(|account| {
            [
                &account.username,
                &account.first_name,
                &account.last_name,
                &account.police_station,
                &account.email,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}
